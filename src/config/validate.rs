//! Config validation: numeric bounds and safe output paths.

use anyhow::{Result, bail};
use std::path::Path;
use tracing::debug;

use super::paths::path_has_symlink_ancestor;
use super::types::Config;
use super::{MAX_COPY_CHUNK, MIN_COPY_CHUNK};

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_moves == 0 {
            bail!("max_concurrent_moves must be at least 1");
        }
        if !(MIN_COPY_CHUNK..=MAX_COPY_CHUNK).contains(&self.copy_chunk_size) {
            bail!(
                "copy chunk size {} bytes is outside {}..={} bytes",
                self.copy_chunk_size,
                MIN_COPY_CHUNK,
                MAX_COPY_CHUNK
            );
        }
        if self.stats_window == 0 {
            bail!("stats_window must be at least 1");
        }
        if let Some(p) = &self.audit_log {
            ensure_no_symlink_ancestor(p, "audit_log")?;
        }
        if let Some(p) = &self.log_file {
            ensure_no_symlink_ancestor(p, "log_file")?;
        }
        debug!(
            max_concurrent = self.max_concurrent_moves,
            margin = self.safety_margin_bytes,
            chunk = self.copy_chunk_size,
            on_conflict = %self.on_conflict,
            "config validated"
        );
        Ok(())
    }
}

fn ensure_no_symlink_ancestor(path: &Path, name: &str) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!("Refusing {name} '{}': an ancestor directory is a symlink", path.display());
    }
    if path.is_dir() {
        bail!("{name} '{}' is a directory", path.display());
    }
    Ok(())
}
