pub mod filename;

use crate::SUPPORTED_EXTENSIONS;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Duplicate take id {id}: {} and {}", .first.display(), .second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// A take file found on disk, not yet decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct TakeFile {
    pub path: PathBuf,
    /// File stem, used as the take id.
    pub id: String,
    pub pass_index: u32,
    pub start_bar: Option<f64>,
}

/// Collect take files from files and directories, sorted by path.
///
/// Pass numbers come from the file name when present. Files without one are
/// numbered after the highest parsed pass, in path order.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<TakeFile>, ScanError> {
    let mut audio_files: Vec<PathBuf> = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(ScanError::NotFound(path.clone()));
        }
        for entry in WalkDir::new(path).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && is_supported(entry.path()) {
                audio_files.push(entry.into_path());
            }
        }
    }
    audio_files.sort();
    audio_files.dedup();

    let parsed: Vec<_> = audio_files
        .iter()
        .map(|p| filename::parse_filename(p))
        .collect();
    let mut next_pass = parsed
        .iter()
        .filter_map(|p| p.pass)
        .max()
        .map_or(0, |m| m + 1);

    let mut takes: Vec<TakeFile> = Vec::with_capacity(audio_files.len());
    for (path, name) in audio_files.into_iter().zip(parsed) {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("take")
            .to_string();
        if let Some(prev) = takes.iter().find(|t| t.id == id) {
            return Err(ScanError::DuplicateId {
                id,
                first: prev.path.clone(),
                second: path,
            });
        }
        let pass_index = name.pass.unwrap_or_else(|| {
            let p = next_pass;
            next_pass += 1;
            p
        });
        takes.push(TakeFile {
            path,
            id,
            pass_index,
            start_bar: name.start_bar,
        });
    }

    log::info!("Found {} take files", takes.len());
    Ok(takes)
}

fn is_supported(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}
