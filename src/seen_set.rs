//! # Seen Sets
//!
//! Line-oriented string sets backed by an append-only file. The in-memory
//! `HashSet` is authoritative; the file is only a durability log replayed at
//! startup. Used for the suppression list, seen emails and seen URLs.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SeenSetError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("value contains a line break and cannot be stored: {0:?}")]
    MultiLine(String),
}

#[derive(Debug)]
pub struct SeenSet {
    path: PathBuf,
    members: HashSet<String>,
}

/// Canonical form of an email address for set membership.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

impl SeenSet {
    /// Replay the log at `path`. A missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self, SeenSetError> {
        Self::load_with(path, trimmed)
    }

    /// Like `load`, but every entry goes through `normalize_email`, so a
    /// hand-edited `Owner@Clinic.com` matches `owner@clinic.com`.
    pub fn load_emails(path: &Path) -> Result<Self, SeenSetError> {
        Self::load_with(path, normalize_email)
    }

    fn load_with(path: &Path, normalize: fn(&str) -> String) -> Result<Self, SeenSetError> {
        let io_err = |source| SeenSetError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut members = HashSet::new();
        match File::open(path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line.map_err(io_err)?;
                    let entry = normalize(&line);
                    if !entry.is_empty() {
                        members.insert(entry);
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(err)),
        }
        debug!("seen_set_loaded path={} entries={}", path.display(), members.len());
        Ok(Self {
            path: path.to_path_buf(),
            members,
        })
    }

    pub fn contains(&self, value: &str) -> bool {
        self.members.contains(value)
    }

    /// Durably append `value`, then mark it in memory.
    ///
    /// Returns `Ok(false)` without writing if the value is already a member.
    /// The in-memory set is only updated after the line has been synced.
    pub fn insert(&mut self, value: &str) -> Result<bool, SeenSetError> {
        if self.members.contains(value) {
            return Ok(false);
        }
        if value.contains(['\n', '\r']) {
            return Err(SeenSetError::MultiLine(value.to_string()));
        }
        self.append_line(value).map_err(|source| SeenSetError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.members.insert(value.to_string());
        Ok(true)
    }

    fn append_line(&self, value: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{value}")?;
        file.flush()?;
        file.sync_data()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The three sets a run consults.
#[derive(Debug)]
pub struct SeenSets {
    /// Externally curated; never written by the pipeline.
    pub suppression: SeenSet,
    pub emails: SeenSet,
    pub urls: SeenSet,
}

impl SeenSets {
    pub fn load(
        suppression: &Path,
        emails: &Path,
        urls: &Path,
    ) -> Result<Self, SeenSetError> {
        Ok(Self {
            suppression: SeenSet::load_emails(suppression)?,
            emails: SeenSet::load_emails(emails)?,
            urls: SeenSet::load(urls)?,
        })
    }
}
