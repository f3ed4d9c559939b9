//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a commented 0600 template at the default location when missing.
//!
//! Notes:
//! - Unknown elements are rejected so typos surface instead of silently using defaults.
//! - Every value is trimmed; empty elements mean "use the default".

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use super::paths::{CONFIG_ENV_VAR, default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::organize::ConflictPolicy;
use crate::platform::write_config_secure_new_0600;

#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config", deny_unknown_fields)]
struct XmlConfig {
    max_concurrent_moves: Option<String>,
    safety_margin_mb: Option<String>,
    copy_chunk_kb: Option<String>,
    stats_window: Option<String>,
    path_length_warning: Option<String>,
    on_conflict: Option<String>,
    preserve_metadata: Option<String>,
    audit_log: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// File that was parsed, if any.
    pub path: Option<PathBuf>,
    /// Set when a template was written during this load.
    pub created_template: Option<PathBuf>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_field<T: FromStr>(name: &str, v: &Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match non_empty(v) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid <{name}> value '{s}': {e}")),
    }
}

fn xml_to_config(x: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();
    if let Some(n) = parse_field::<usize>("max_concurrent_moves", &x.max_concurrent_moves)? {
        cfg.max_concurrent_moves = n;
    }
    if let Some(mb) = parse_field::<u64>("safety_margin_mb", &x.safety_margin_mb)? {
        cfg.safety_margin_bytes = mb.saturating_mul(1024 * 1024);
    }
    if let Some(kb) = parse_field::<usize>("copy_chunk_kb", &x.copy_chunk_kb)? {
        cfg.copy_chunk_size = kb.saturating_mul(1024);
    }
    if let Some(n) = parse_field::<usize>("stats_window", &x.stats_window)? {
        cfg.stats_window = n;
    }
    if let Some(n) = parse_field::<usize>("path_length_warning", &x.path_length_warning)? {
        cfg.path_length_warning = n;
    }
    if let Some(p) = parse_field::<ConflictPolicy>("on_conflict", &x.on_conflict)? {
        cfg.on_conflict = p;
    }
    if let Some(b) = parse_field::<bool>("preserve_metadata", &x.preserve_metadata)? {
        cfg.preserve_metadata = b;
    }
    if let Some(l) = parse_field::<LogLevel>("log_level", &x.log_level)? {
        cfg.log_level = l;
    }
    cfg.audit_log = non_empty(&x.audit_log).map(PathBuf::from);
    cfg.log_file = non_empty(&x.log_file).map(PathBuf::from);
    Ok(cfg)
}

/// Parse a specific config file.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig =
        from_xml_str(&contents).with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("config xml '{}'", path.display()))
}

/// Resolve and load the configuration.
/// `explicit` (the --config flag) wins over `$MEDIA_ORGANIZER_CONFIG`, which wins over
/// the per-OS default. An explicitly named file must exist; a missing default gets a
/// template and the built-in defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(p) = explicit {
        return Ok(LoadedConfig {
            config: load_config_from_xml_path(p)?,
            path: Some(p.to_path_buf()),
            created_template: None,
        });
    }

    let env_set = env::var_os(CONFIG_ENV_VAR).is_some_and(|v| !v.is_empty());
    let Some(path) = default_config_path() else {
        return Ok(LoadedConfig {
            config: Config::default(),
            path: None,
            created_template: None,
        });
    };

    if !path.exists() {
        if env_set {
            bail!("{CONFIG_ENV_VAR} points to a missing file: '{}'", path.display());
        }
        let created_template = match create_template_config(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not create template config");
                None
            }
        };
        return Ok(LoadedConfig {
            config: Config::default(),
            path: None,
            created_template,
        });
    }

    Ok(LoadedConfig {
        config: load_config_from_xml_path(&path)?,
        path: Some(path),
        created_template: None,
    })
}

/// Write the commented default config to `path` (0600, never following a symlinked ancestor).
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!("Refusing to create config: an ancestor of '{}' is a symlink", path.display());
    }
    let d = Config::default();
    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "/path/to/media_organizer.log".into());

    let content = format!(
        r#"<!--
  media_organizer configuration (XML)

    max_concurrent_moves  -> moves allowed to touch the disk at once
    safety_margin_mb      -> free space (MiB) that must remain on the target volume
    copy_chunk_kb         -> cross-volume copy chunk size in KiB (4..16384)
    stats_window          -> recent operations kept for the average duration
    path_length_warning   -> warn when a target path is longer than this
    on_conflict           -> fail | overwrite | rename
    preserve_metadata     -> true | false (timestamps and permissions on copies)
    audit_log             -> JSON-lines audit file (empty = audit entries go to the log)
    log_level             -> quiet | normal | info | debug
    log_file              -> optional log file, e.g. {suggested_log}

  CLI flags override these values.
-->
<config>
  <max_concurrent_moves>{}</max_concurrent_moves>
  <safety_margin_mb>{}</safety_margin_mb>
  <copy_chunk_kb>{}</copy_chunk_kb>
  <stats_window>{}</stats_window>
  <path_length_warning>{}</path_length_warning>
  <on_conflict>{}</on_conflict>
  <preserve_metadata>{}</preserve_metadata>
  <audit_log></audit_log>
  <log_level>{}</log_level>
  <log_file></log_file>
</config>
"#,
        d.max_concurrent_moves,
        d.safety_margin_bytes / (1024 * 1024),
        d.copy_chunk_size / 1024,
        d.stats_window,
        d.path_length_warning,
        d.on_conflict,
        d.preserve_metadata,
        d.log_level,
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!(path = %path.display(), "created template config");
    Ok(())
}
