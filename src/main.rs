use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use takecomp::analyzer::metrics::amplitude_to_db;
use takecomp::comp::CompEngine;
use takecomp::comp::models::{BarRange, CompResult, ManualSegment};
use takecomp::config::AppConfig;
use takecomp::take::Take;

#[derive(Parser)]
#[command(name = "takecomp", version, about = "Automatic take comping for loop recordings")]
struct Cli {
    /// Config file (defaults to ~/.config/takecomp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TakeArgs {
    /// Take files or directories (defaults to config file music_dirs)
    paths: Vec<PathBuf>,

    /// Session tempo
    #[arg(long)]
    bpm: f64,

    /// Start bar for takes whose file name has no bar marker
    #[arg(long, default_value = "0")]
    take_start: f64,

    /// Number of parallel workers (0 = auto-detect from config)
    #[arg(short = 'j', long, default_value = "0")]
    jobs: usize,
}

#[derive(Args)]
struct RegionArgs {
    /// First bar of the comp region (defaults to the earliest take start)
    #[arg(long)]
    start_bar: Option<f64>,

    /// End bar of the comp region (defaults to the latest take end)
    #[arg(long)]
    end_bar: Option<f64>,

    /// Manual comp instead of automatic: "take_id:start-end,take_id:start-end"
    #[arg(long)]
    manual: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure take metrics (levels, SNR, timing)
    Analyze {
        #[command(flatten)]
        takes: TakeArgs,
    },

    /// Choose the best take per segment and show the comp plan
    Plan {
        #[command(flatten)]
        takes: TakeArgs,

        #[command(flatten)]
        region: RegionArgs,

        /// Write the plan as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a comp to a stereo WAV file
    Render {
        #[command(flatten)]
        takes: TakeArgs,

        #[command(flatten)]
        region: RegionArgs,

        /// Render a saved (possibly edited) plan instead of planning
        #[arg(long, conflicts_with = "manual")]
        plan: Option<PathBuf>,

        /// Output WAV path
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Config file is optional: --config > XDG default > built-in defaults
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Analyze { takes } => {
            let loaded = load_takes(&takes, &config)?;
            print_metrics_table(&loaded);
        }

        Commands::Plan { takes, region, output } => {
            let loaded = load_takes(&takes, &config)?;
            let engine = build_engine(&config, &loaded)?;
            let plan = make_plan(&engine, &loaded, &region)?;
            print_plan(&plan);

            if let Some(path) = output {
                takecomp::export::write_plan(&path, &plan)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!();
                println!("Plan written to {}", path.display());
            }
        }

        Commands::Render { takes, region, plan, out } => {
            let loaded = load_takes(&takes, &config)?;
            let engine = build_engine(&config, &loaded)?;
            let plan = match plan {
                Some(path) => takecomp::export::read_plan(&path)
                    .with_context(|| format!("Failed to read plan {}", path.display()))?,
                None => make_plan(&engine, &loaded, &region)?,
            };

            let rendered = engine
                .render(&loaded, &plan, takes.bpm)
                .context("Render failed")?;
            takecomp::export::write_wav(&out, &rendered)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!(
                "Rendered {} segments, {} crossfades, {:.2}s (peak {:.1} dBFS) to {}",
                plan.segment_count,
                plan.crossfades.len(),
                rendered.duration_secs(),
                amplitude_to_db(rendered.peak() as f64),
                out.display()
            );
        }
    }

    Ok(())
}

fn load_takes(args: &TakeArgs, config: &AppConfig) -> Result<Vec<Take>> {
    // Resolve take paths: CLI args > config music_dirs
    let paths = if !args.paths.is_empty() {
        args.paths.clone()
    } else if !config.music_dirs.is_empty() {
        config.music_dirs.clone()
    } else {
        anyhow::bail!("No takes given. Pass paths as arguments or set music_dirs in config.");
    };

    let files = takecomp::scanner::discover(&paths).context("Take discovery failed")?;
    let workers = if args.jobs > 0 { args.jobs } else { config.resolve_workers() };
    let result = takecomp::analyzer::load_takes(
        &files,
        args.bpm,
        args.take_start,
        config.engine.time_signature,
        workers,
    )
    .context("Analysis failed")?;

    if result.failed > 0 {
        eprintln!("Warning: {} take files failed to load", result.failed);
    }
    if result.takes.is_empty() {
        anyhow::bail!("No takes loaded.");
    }
    Ok(result.takes)
}

/// Engine at the configured sample rate, else the first take's rate.
fn build_engine(config: &AppConfig, takes: &[Take]) -> Result<CompEngine> {
    let sample_rate = config
        .sample_rate
        .or_else(|| takes.first().map(|t| t.samples().sample_rate()))
        .unwrap_or(48_000);
    CompEngine::new(sample_rate, config.engine.clone()).context("Invalid comp configuration")
}

fn make_plan(engine: &CompEngine, takes: &[Take], region: &RegionArgs) -> Result<CompResult> {
    if let Some(spec) = &region.manual {
        let segments = parse_manual(spec)?;
        return Ok(engine.plan_manual(takes, &segments));
    }

    let start = region
        .start_bar
        .unwrap_or_else(|| takes.iter().map(|t| t.start_bar()).fold(f64::INFINITY, f64::min));
    let end = region
        .end_bar
        .unwrap_or_else(|| takes.iter().map(|t| t.end_bar()).fold(f64::NEG_INFINITY, f64::max));
    engine
        .plan_auto(takes, &BarRange::new(start, end))
        .context("Planning failed")
}

/// Parse "take_id:start-end,take_id:start-end" into manual segments.
fn parse_manual(spec: &str) -> Result<Vec<ManualSegment>> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| {
            let (id, range) = item
                .rsplit_once(':')
                .with_context(|| format!("Expected take_id:start-end, got \"{item}\""))?;
            let (start, end) = range
                .split_once('-')
                .with_context(|| format!("Expected start-end bar range, got \"{range}\""))?;
            let start: f64 = start
                .trim()
                .parse()
                .with_context(|| format!("Bad start bar in \"{item}\""))?;
            let end: f64 = end
                .trim()
                .parse()
                .with_context(|| format!("Bad end bar in \"{item}\""))?;
            Ok(ManualSegment::new(id.trim(), start, end))
        })
        .collect()
}

fn print_metrics_table(takes: &[Take]) {
    println!(
        "{:<25} {:>4} {:>13} {:>7} {:>7} {:>6} {:>7}",
        "Take", "Pass", "Bars", "Peak", "RMS", "SNR", "Timing"
    );
    println!("{}", "-".repeat(76));

    for t in takes {
        let m = t.metrics();
        println!(
            "{:<25} {:>4} {:>13} {:>7.1} {:>7.1} {:>6.1} {:>7.1}",
            truncate(t.id(), 25),
            t.pass_index(),
            format!("{:.1}-{:.1}", t.start_bar(), t.end_bar()),
            m.peak_db,
            m.rms_db,
            m.snr,
            m.timing_error_ms,
        );
    }

    println!();
    println!("Peak/RMS in dBFS, SNR in dB, Timing = first onset distance from the beat grid (ms)");
}

fn print_plan(plan: &CompResult) {
    println!(
        "Comp {}: {} segments, average score {:.3}",
        plan.id, plan.segment_count, plan.average_score
    );
    println!();
    println!("{:<13} {:<25} {:>6}  {}", "Bars", "Take", "Score", "Reason");
    println!("{}", "-".repeat(80));

    for seg in &plan.segments {
        println!(
            "{:<13} {:<25} {:>6.3}  {}",
            format!("{:.1}-{:.1}", seg.start_bar, seg.end_bar),
            truncate(&seg.take_id, 25),
            seg.score,
            seg.reason,
        );
    }

    if !plan.crossfades.is_empty() {
        println!();
        println!("Crossfades:");
        for xf in &plan.crossfades {
            println!("  bar {:>6.1}  {:>5.1} ms  {:?}", xf.bar, xf.duration_ms, xf.kind);
        }
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manual() {
        let segs = parse_manual("take1:0-4, take_02:4-6.5").unwrap();
        assert_eq!(
            segs,
            vec![
                ManualSegment::new("take1", 0.0, 4.0),
                ManualSegment::new("take_02", 4.0, 6.5),
            ]
        );
    }

    #[test]
    fn test_parse_manual_errors() {
        assert!(parse_manual("take1").is_err());
        assert!(parse_manual("take1:4").is_err());
        assert!(parse_manual("take1:a-b").is_err());
        assert!(parse_manual("").unwrap().is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a_very_long_take_name", 10), "a_very_...");
    }
}
