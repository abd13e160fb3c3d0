//! # Checkpoint Store
//!
//! Progress marker for resumable runs. `location_index` is the next location
//! to process, so a saved state means "everything before this index is done".

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub location_index: usize,
    pub captured_count: u64,
    pub date: String,
}

impl CheckpointState {
    pub fn new(location_index: usize, captured_count: u64, date: &str) -> Self {
        Self {
            location_index,
            captured_count,
            date: date.to_string(),
        }
    }
}

pub fn load_checkpoint(path: &Path) -> Result<CheckpointState, CheckpointError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Overwrite the checkpoint atomically: temp file in the same directory,
/// synced, then renamed over `path`.
pub fn save_checkpoint(path: &Path, state: &CheckpointState) -> Result<(), CheckpointError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, state)?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CheckpointError::Io(e.error))?;
    Ok(())
}

/// State to resume from, if any.
///
/// Disabled resume, a missing file and an unreadable or malformed file all
/// mean a fresh start; the last case is logged.
pub fn resume_state(path: &Path, resume: bool, today: &str) -> Option<CheckpointState> {
    if !resume {
        info!("resume disabled; starting from the first location");
        return None;
    }
    if !path.exists() {
        info!("no checkpoint at {}; starting fresh", path.display());
        return None;
    }
    match load_checkpoint(path) {
        Ok(state) => {
            if state.date != today {
                info!(
                    "checkpoint date {} differs from today {}; continuing its captured_count",
                    state.date, today
                );
            }
            info!(
                "resuming at location_index={} captured_count={}",
                state.location_index, state.captured_count
            );
            Some(state)
        }
        Err(err) => {
            warn!(
                "ignoring unreadable checkpoint {}: {err}; starting fresh",
                path.display()
            );
            None
        }
    }
}
