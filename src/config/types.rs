//! Core configuration types.
//! - Config holds engine and process settings with sensible defaults.
//! - LogLevel is the user-facing verbosity knob.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::organize::{
    COPY_CHUNK_DEFAULT, ConflictPolicy, MAX_CONCURRENT_DEFAULT, PATH_LENGTH_WARNING_DEFAULT,
    SAFETY_MARGIN_DEFAULT, STATS_WINDOW_DEFAULT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    #[default]
    Normal,
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Case-insensitive; accepts a few common aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" | "warn" => Some(LogLevel::Normal),
            "info" | "verbose" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        })
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Upper bound on moves touching the disk at once
    pub max_concurrent_moves: usize,
    /// Free space that must remain on the target volume after a move
    pub safety_margin_bytes: u64,
    /// Read/write unit for cross-volume copies
    pub copy_chunk_size: usize,
    /// Number of recent durations in the rolling average
    pub stats_window: usize,
    /// Target paths longer than this get a warning
    pub path_length_warning: usize,
    pub on_conflict: ConflictPolicy,
    /// Carry timestamps and permission bits across volumes
    pub preserve_metadata: bool,
    /// JSON-lines audit file; audit entries go to the log when unset
    pub audit_log: Option<PathBuf>,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_moves: MAX_CONCURRENT_DEFAULT,
            safety_margin_bytes: SAFETY_MARGIN_DEFAULT,
            copy_chunk_size: COPY_CHUNK_DEFAULT,
            stats_window: STATS_WINDOW_DEFAULT,
            path_length_warning: PATH_LENGTH_WARNING_DEFAULT,
            on_conflict: ConflictPolicy::Fail,
            preserve_metadata: true,
            audit_log: None,
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }
}
