pub mod analyzer;
pub mod audio;
pub mod comp;
pub mod config;
pub mod export;
pub mod scanner;
pub mod take;

#[cfg(test)]
mod testutil;

/// Take file extensions we can decode
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav"];

/// Application name for XDG paths
pub const APP_NAME: &str = "takecomp";
