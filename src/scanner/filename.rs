use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Take info extracted from the file name.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedName {
    pub pass: Option<u32>,
    pub start_bar: Option<f64>,
}

// "take03", "take_3", "pass-3", "tk7", "t05" (not inside other words)
static PASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(?:take|pass|tk|t)[\s_-]?(\d{1,4})(?:[^\d]|$)").unwrap()
});

// "bar8", "bar_16", "b12.5", "@bar 4"
static BAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(?:bar|b)[\s_-]?(\d+(?:\.\d+)?)(?:[^\d.]|$)").unwrap()
});

/// Parse the pass number and start bar from a take's file name.
pub fn parse_filename(path: &Path) -> ParsedName {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let pass = PASS_RE
        .captures(stem)
        .and_then(|c| c[1].parse::<u32>().ok());
    let start_bar = BAR_RE
        .captures(stem)
        .and_then(|c| c[1].parse::<f64>().ok());

    ParsedName { pass, start_bar }
}
