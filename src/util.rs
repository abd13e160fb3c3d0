//! # Utility Module
//!
//! Small helpers shared by the stores, the exporter and the binary: directory
//! checks, filename slugs and the date stamp used in checkpoints and prefixes.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::config::Config;

/// Create `path` if needed and check that files can be created in it.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        bail!("output path is not a directory: {}", path.display());
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create output dir {}", path.display()))?;
    tempfile::tempfile_in(path)
        .with_context(|| format!("output directory is not writable: {}", path.display()))?;
    Ok(())
}

/// Create every directory the run writes into: output, logs, and the parents
/// of the set and checkpoint files.
pub fn ensure_run_dirs(cfg: &Config) -> Result<()> {
    ensure_output_dir(&cfg.output_base)?;
    std::fs::create_dir_all(&cfg.log_dir)?;
    for file in [
        &cfg.suppression_file,
        &cfg.seen_emails_file,
        &cfg.seen_urls_file,
        &cfg.state_file,
    ] {
        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Calendar date of the local clock, `YYYY-MM-DD`.
pub fn today_slug() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Filesystem-safe form of a location name.
///
/// Letters and digits of any script are kept (lowercased), every other run of
/// characters collapses to a single `_`. An empty result becomes `location`.
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_sep = false;
    for ch in value.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        "location".to_string()
    } else {
        out
    }
}
