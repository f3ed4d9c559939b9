//! Application orchestrator.
//! Loads and merges config, initializes logging, wires Ctrl-C to the shared
//! cancel token, and dispatches the subcommand.

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error};

use media_organizer::organize::{SystemVolumes, ValidationEngine};
use media_organizer::{
    CancelToken, Config, MemoryCatalog, OperationRecord, OperationRequest, OrganizeEngine, OrganizeError, load_config,
    sweep_orphaned_partials,
};

use crate::cli::{Args, Command, file_id_for};
use crate::logging::init_tracing;
use crate::output as out;

pub fn run(args: Args) -> Result<()> {
    let loaded = load_config(args.config.as_deref())?;
    let mut cfg = loaded.config;
    args.apply_overrides(&mut cfg);
    cfg.validate()?;

    let guard = init_tracing(cfg.log_level, cfg.log_file.as_deref(), args.json).inspect_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
    })?;
    if let Some(p) = &loaded.created_template {
        out::print_warn(&format!("Wrote a template config to '{}'; edit it to change defaults", p.display()));
    }

    // Dropping the guard on Ctrl-C flushes buffered file logs.
    let guard_slot = Arc::new(Mutex::new(guard));
    let cancel = CancelToken::new();
    {
        let guard_slot = Arc::clone(&guard_slot);
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            cancel.cancel();
            out::print_warn("Received interrupt; finishing in-progress work and stopping...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .context("install Ctrl-C handler")?;
    }

    debug!(config = ?loaded.path, "starting media_organizer: {:?}", args.command);
    let result = dispatch(&args, &cfg, &cancel);

    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    result
}

fn dispatch(args: &Args, cfg: &Config, cancel: &CancelToken) -> Result<()> {
    match &args.command {
        Command::Validate {
            source,
            target,
            file_id,
        } => {
            let validator =
                ValidationEngine::new(Arc::new(SystemVolumes), cfg.safety_margin_bytes, cfg.path_length_warning);
            let id = file_id_for(file_id.as_deref(), source);
            let r = validator.validate(&id, source, target);
            if args.json {
                out::print_json(&r)?;
            } else {
                for w in r.warnings() {
                    out::print_warn(w);
                }
                for e in r.errors() {
                    out::print_error(e);
                }
                if r.is_valid() {
                    out::print_success(&format!(
                        "'{}' can be moved to '{}' ({}{})",
                        source.display(),
                        target.display(),
                        if r.is_cross_volume() { "copy across volumes" } else { "rename" },
                        if r.requires_directory_creation() { ", creates directories" } else { "" }
                    ));
                }
            }
            if !r.is_valid() {
                bail!("validation failed with {} error(s)", r.errors().len());
            }
            Ok(())
        }
        Command::Move {
            source,
            target,
            file_id,
            no_create_dirs,
            ..
        } => {
            let engine = OrganizeEngine::builder(cfg).build()?;
            let req = OperationRequest::new(file_id_for(file_id.as_deref(), source), source, target)
                .create_directories(!no_create_dirs);
            let res = engine.organize(&req, cancel);
            report_one(args.json, &req, &res)?;
            res.map(|_| ()).map_err(anyhow::Error::from)
        }
        Command::Batch { manifest, .. } => run_batch(args.json, cfg, manifest, cancel),
        Command::Sweep { dir, min_age_secs } => {
            let report = sweep_orphaned_partials(dir, Duration::from_secs(*min_age_secs))?;
            if args.json {
                out::print_json(&report)?;
            } else {
                for p in &report.removed {
                    out::print_info(&format!("removed {}", p.display()));
                }
                out::print_success(&format!(
                    "swept {}: {} partial file(s) removed, {} bytes reclaimed, {} too recent",
                    dir.display(),
                    report.removed.len(),
                    report.bytes_reclaimed,
                    report.skipped_recent
                ));
            }
            if report.errors > 0 {
                bail!("{} partial file(s) could not be removed", report.errors);
            }
            Ok(())
        }
    }
}

fn report_one(json: bool, req: &OperationRequest, res: &Result<OperationRecord, OrganizeError>) -> Result<()> {
    match res {
        Ok(rec) if json => out::print_json(rec)?,
        Ok(rec) => out::print_success(&format!(
            "[{}] '{}' -> '{}' ({} bytes{})",
            rec.file_id,
            rec.source_path.display(),
            rec.target_path.display(),
            rec.bytes_moved,
            if rec.was_cross_volume { ", copied across volumes" } else { "" }
        )),
        Err(e) if json => out::print_json(&serde_json::json!({
            "file_id": req.file_id,
            "success": false,
            "code": e.code(),
            "kind": e.kind(),
            "error": e.to_string(),
        }))?,
        Err(e) => {
            error!(file_id = %req.file_id, code = e.code(), kind = e.kind(), "move failed");
            out::print_error(&format!("[{}] {e}", req.file_id));
        }
    }
    Ok(())
}

/// One manifest line: `file_id<TAB>source<TAB>target`. Blank lines and `#` comments are skipped.
fn parse_manifest(text: &str) -> Result<Vec<(String, PathBuf, PathBuf)>> {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let [id, src, dst] = fields.as_slice() else {
            bail!("manifest line {}: expected 3 tab-separated fields, found {}", n + 1, fields.len());
        };
        let id = id.trim();
        if id.is_empty() {
            bail!("manifest line {}: empty file id", n + 1);
        }
        if !seen.insert(id.to_string()) {
            bail!("manifest line {}: duplicate file id '{id}'", n + 1);
        }
        rows.push((id.to_string(), PathBuf::from(src.trim()), PathBuf::from(dst.trim())));
    }
    Ok(rows)
}

fn run_batch(json: bool, cfg: &Config, manifest: &Path, cancel: &CancelToken) -> Result<()> {
    let text = fs::read_to_string(manifest).with_context(|| format!("read manifest '{}'", manifest.display()))?;
    let entries = parse_manifest(&text)?;

    let catalog = Arc::new(MemoryCatalog::new());
    for (id, src, _) in &entries {
        catalog.insert(id.clone(), src);
    }
    let engine = OrganizeEngine::builder(cfg).catalog(catalog).build()?;

    // rayon fans out; the engine's governor bounds how many touch the disk.
    let results: Vec<_> = entries
        .par_iter()
        .map(|(id, src, dst)| {
            let res = engine.organize_by_id(id, dst, true, cancel);
            (OperationRequest::new(id.as_str(), src, dst), res)
        })
        .collect();

    let mut failed = 0usize;
    for (req, res) in &results {
        report_one(json, req, res)?;
        if res.is_err() {
            failed += 1;
        }
    }
    let stats = engine.stats();
    if json {
        out::print_json(&stats)?;
    } else {
        out::print_info(&format!(
            "{} moved, {} failed ({:.1}% success), {} bytes, avg {} ms",
            stats.completed_count,
            stats.failed_count,
            stats.success_rate_percent,
            stats.total_bytes_moved,
            stats.average_duration.as_millis()
        ));
    }
    if failed > 0 {
        bail!("{failed} of {} operation(s) failed", results.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parsing() {
        let text = "# id\tsrc\tdst\n\nm1\t/in/a.mkv\t/lib/a.mkv\r\nm2\t/in/b.mkv\t/lib/b.mkv\n";
        let rows = parse_manifest(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "m1");
        assert_eq!(rows[1].2, PathBuf::from("/lib/b.mkv"));
    }

    #[test]
    fn manifest_rejects_bad_lines() {
        assert!(parse_manifest("m1\t/in/a.mkv\n").is_err());
        assert!(parse_manifest("m1\ta\tb\nm1\tc\td\n").is_err());
        assert!(parse_manifest(" \ta\tb\n").is_err());
    }
}
