//! Tracing initialization.
//! Registry + EnvFilter + a console layer (compact or JSON) on stderr, plus an
//! optional non-blocking file layer.
//!
//! Notes:
//! - Stdout is reserved for command results so `--json` output stays parseable.
//! - File logging is refused when any ancestor of the path is a symlink.
//! - The returned WorkerGuard must live until exit or buffered lines are lost.

use anyhow::Result;
use chrono::Local;
use std::fmt as stdfmt;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

use media_organizer::LogLevel;
use media_organizer::config::path_has_symlink_ancestor;
use media_organizer::platform::open_log_file_secure_append;

use crate::output as out;

/// DD/MM/YY HH:MM:SS in local time.
struct LocalHumanTime;
impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

fn to_level_filter(lvl: LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Info => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

fn open_file_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match path_has_symlink_ancestor(path) {
        Ok(false) => {}
        Ok(true) => {
            out::print_warn(&format!(
                "Refusing file logging to '{}': an ancestor is a symlink",
                path.display()
            ));
            return None;
        }
        Err(e) => {
            out::print_warn(&format!("Cannot check log path '{}': {e}", path.display()));
            return None;
        }
    }
    match open_log_file_secure_append(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            out::print_warn(&format!(
                "Failed to open log file '{}': {e}; logging to the console only",
                path.display()
            ));
            None
        }
    }
}

pub fn init_tracing(lvl: LogLevel, log_file: Option<&Path>, json: bool) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::default().add_directive(to_level_filter(lvl).into());
    let (file_writer, guard) = match log_file.and_then(open_file_writer) {
        Some((w, g)) => (Some(w), Some(g)),
        None => (None, None),
    };

    // Option<Layer> is itself a layer, which keeps one init call for all four combinations.
    let console_json = json.then(|| {
        tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalHumanTime)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
    });
    let console_compact = (!json).then(|| {
        tsfmt::layer()
            .with_timer(LocalHumanTime)
            .with_target(true)
            .with_thread_ids(true)
            .compact()
            .with_writer(std::io::stderr)
    });
    let file_json = file_writer.clone().filter(|_| json).map(|w| {
        tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalHumanTime)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(w)
    });
    let file_compact = file_writer.filter(|_| !json).map(|w| {
        tsfmt::layer()
            .with_timer(LocalHumanTime)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .compact()
            .with_writer(w)
    });

    registry()
        .with(filter)
        .with(console_json)
        .with(console_compact)
        .with(file_json)
        .with(file_compact)
        .try_init()?;
    Ok(guard)
}
