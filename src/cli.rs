//! CLI definition and parsing.
//!
//! Notes:
//! - Global flags may appear before or after the subcommand.
//! - --debug is a shorthand for --log-level debug and wins over it.
//! - Flags override config.xml values; unset flags leave them alone.

use clap::{Parser, Subcommand, ValueHint};
use std::path::{Path, PathBuf};

use media_organizer::{Config, ConflictPolicy, LogLevel};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Atomically organize media files into a library")]
pub struct Args {
    /// Config file to use instead of $MEDIA_ORGANIZER_CONFIG or the per-OS default.
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Log level: quiet, normal, info, debug.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[arg(short = 'd', long, global = true, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Structured JSON for logs and command output.
    #[arg(long, global = true)]
    pub json: bool,

    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// JSON-lines audit file (overrides <audit_log>).
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub audit_log: Option<PathBuf>,

    /// Moves allowed to touch the disk at once (overrides <max_concurrent_moves>).
    #[arg(long, global = true, value_name = "N")]
    pub max_concurrent: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the pre-flight checks for one move without touching anything.
    Validate {
        #[arg(value_hint = ValueHint::FilePath)]
        source: PathBuf,
        #[arg(value_hint = ValueHint::FilePath)]
        target: PathBuf,
        #[arg(long)]
        file_id: Option<String>,
    },
    /// Move one file into the library.
    Move {
        #[arg(value_hint = ValueHint::FilePath)]
        source: PathBuf,
        #[arg(value_hint = ValueHint::FilePath)]
        target: PathBuf,
        #[arg(long)]
        file_id: Option<String>,
        /// Fail instead of creating a missing target directory.
        #[arg(long)]
        no_create_dirs: bool,
        /// fail | overwrite | rename
        #[arg(long, value_name = "POLICY")]
        on_conflict: Option<ConflictPolicy>,
    },
    /// Move every `file_id<TAB>source<TAB>target` line of a manifest in parallel.
    Batch {
        #[arg(value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
        #[arg(long, value_name = "POLICY")]
        on_conflict: Option<ConflictPolicy>,
    },
    /// Delete partial copies left behind by an interrupted run.
    Sweep {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        /// Only remove partials at least this old.
        #[arg(long, default_value_t = 3600)]
        min_age_secs: u64,
    },
}

impl Args {
    /// Precedence: --debug > --log-level > config.
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level
    }

    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }
        if let Some(p) = &self.audit_log {
            cfg.audit_log = Some(p.clone());
        }
        if let Some(n) = self.max_concurrent {
            cfg.max_concurrent_moves = n;
        }
        match &self.command {
            Command::Move {
                on_conflict: Some(p), ..
            }
            | Command::Batch {
                on_conflict: Some(p), ..
            } => cfg.on_conflict = *p,
            _ => {}
        }
    }
}

/// Default file id: the source's file name.
pub fn file_id_for(explicit: Option<&str>, source: &Path) -> String {
    match explicit {
        Some(id) => id.to_string(),
        None => source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string()),
    }
}

pub fn parse() -> Args {
    Args::parse()
}
