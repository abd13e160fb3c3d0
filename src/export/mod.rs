//! # Export Module
//!
//! Writes accepted result rows to output artifacts. Two shapes exist:
//! numbered chunk files (`{prefix}_chunkNNN`) fed from the run-wide buffer,
//! and one partial file per location (`{location}_partNNN`). Every artifact
//! is written to a temp file and renamed into place, and no existing artifact
//! is ever rewritten by a chunk flush.

pub mod csv;
pub mod jsonl;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::util::slugify;

/// One accepted, validated email capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub timestamp: String,
    pub location: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub url: String,
    pub email: String,
    pub status: String,
    pub source: String,
}

pub const ROW_FIELDS: [&str; 7] = [
    "timestamp", "location", "name", "url", "email", "status", "source",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Jsonl,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
}

/// Serializes a group of rows into the bytes of one artifact.
pub trait RowEncoder: Send + Sync {
    fn encode(&self, rows: &[ResultRow]) -> Result<Vec<u8>, ExportError>;
}

pub fn build_encoder(format: ExportFormat) -> Box<dyn RowEncoder> {
    match format {
        ExportFormat::Csv => Box::new(csv::CsvEncoder),
        ExportFormat::Jsonl => Box::new(jsonl::JsonlEncoder),
    }
}

/// Write `content` to `dir/filename` via a synced temp file and a rename.
/// With `replace == false` an existing target is an error instead of being
/// overwritten.
fn write_artifact(
    dir: &Path,
    filename: &str,
    content: &[u8],
    replace: bool,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    let persisted = if replace {
        tmp.persist(&target)
    } else {
        tmp.persist_noclobber(&target)
    };
    persisted.map_err(|e| ExportError::Io(e.error))?;
    Ok(target)
}

pub fn chunk_file_name(prefix: &str, seq: usize, format: ExportFormat) -> String {
    format!("{prefix}_chunk{seq:03}.{}", format.extension())
}

pub fn partial_file_name(location: &str, part_index: usize, format: ExportFormat) -> String {
    format!(
        "{}_part{part_index:03}.{}",
        slugify(location),
        format.extension()
    )
}

/// Split `rows` into groups of at most `chunk_size` and write each group as
/// its own artifact, numbered from `first_seq`. Zero rows writes nothing.
pub fn export_rows_in_chunks(
    rows: &[ResultRow],
    chunk_size: usize,
    output_base: &Path,
    prefix: &str,
    format: ExportFormat,
    first_seq: usize,
) -> Result<Vec<PathBuf>, ExportError> {
    if chunk_size == 0 {
        return Err(ExportError::ZeroChunkSize);
    }
    let encoder = build_encoder(format);
    let mut paths = Vec::new();
    for (offset, group) in rows.chunks(chunk_size).enumerate() {
        let name = chunk_file_name(prefix, first_seq + offset, format);
        let path = write_artifact(output_base, &name, &encoder.encode(group)?, true)?;
        paths.push(path);
    }
    Ok(paths)
}

/// Write all of a location's rows as a single artifact. An existing file of
/// the same name is never replaced.
pub fn export_location_partial(
    rows: &[ResultRow],
    output_base: &Path,
    location: &str,
    part_index: usize,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    let encoder = build_encoder(format);
    let name = partial_file_name(location, part_index, format);
    write_artifact(output_base, &name, &encoder.encode(rows)?, false)
}

/// Digits at the start of `rest` when they are directly followed by the
/// file extension.
fn leading_seq(rest: &str) -> Option<usize> {
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 || !rest[digits..].starts_with('.') {
        return None;
    }
    rest[..digits].parse().ok()
}

/// One past the highest number `seq_of` finds among the file names in `dir`.
fn next_free_seq(dir: &Path, seq_of: impl Fn(&str) -> Option<usize>) -> Result<usize, ExportError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(1),
        Err(err) => return Err(err.into()),
    };
    let mut highest = 0usize;
    for entry in entries.filter_map(|e| e.ok()) {
        if let Some(seq) = seq_of(&entry.file_name().to_string_lossy()) {
            highest = highest.max(seq);
        }
    }
    Ok(highest + 1)
}

/// First chunk sequence number not yet used by `{prefix}_chunkNNN.*` in `dir`.
pub fn next_chunk_seq(dir: &Path, prefix: &str) -> Result<usize, ExportError> {
    let marker = format!("{prefix}_chunk");
    next_free_seq(dir, |name| name.strip_prefix(marker.as_str()).and_then(leading_seq))
}

/// First partial index not yet used by any `{slug}_partNNN.*` in `dir`.
///
/// Partial numbering is shared by all locations, so a later run over the same
/// output directory continues after every earlier partial.
pub fn next_part_index(dir: &Path) -> Result<usize, ExportError> {
    next_free_seq(dir, |name| {
        let at = name.rfind("_part")?;
        leading_seq(&name[at + "_part".len()..])
    })
}

/// Run-wide row buffer with "pending since last flush" semantics.
///
/// Rows are handed in as they are accepted; `flush` writes only the rows that
/// arrived since the previous flush and then clears them. Numbering continues
/// after the highest chunk already present for `prefix`.
pub struct ChunkedExporter {
    output_base: PathBuf,
    prefix: String,
    chunk_size: usize,
    format: ExportFormat,
    pending: Vec<ResultRow>,
    next_seq: usize,
    written: Vec<PathBuf>,
}

impl ChunkedExporter {
    pub fn new(
        output_base: &Path,
        prefix: &str,
        chunk_size: usize,
        format: ExportFormat,
    ) -> Result<Self, ExportError> {
        if chunk_size == 0 {
            return Err(ExportError::ZeroChunkSize);
        }
        let next_seq = next_chunk_seq(output_base, prefix)?;
        Ok(Self {
            output_base: output_base.to_path_buf(),
            prefix: prefix.to_string(),
            chunk_size,
            format,
            pending: Vec::new(),
            next_seq,
            written: Vec::new(),
        })
    }

    pub fn push(&mut self, row: ResultRow) {
        self.pending.push(row);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Chunk files written so far by this exporter.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Write pending rows as chunk artifacts. On error the pending rows are
    /// kept so a later flush can retry them.
    pub fn flush(&mut self) -> Result<Vec<PathBuf>, ExportError> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let paths = export_rows_in_chunks(
            &self.pending,
            self.chunk_size,
            &self.output_base,
            &self.prefix,
            self.format,
            self.next_seq,
        )?;
        info!(
            "chunk_flush prefix={} rows={} files={} first_seq={}",
            self.prefix,
            self.pending.len(),
            paths.len(),
            self.next_seq
        );
        self.next_seq += paths.len();
        self.pending.clear();
        self.written.extend(paths.iter().cloned());
        Ok(paths)
    }
}

#[cfg(test)]
pub(crate) fn sample_row(location: &str, email: &str) -> ResultRow {
    ResultRow {
        timestamp: "2024-05-01T12:00:00+00:00".to_string(),
        location: location.to_string(),
        display_name: "Clinic, \"Central\"".to_string(),
        url: format!("https://{location}.example/contact"),
        email: email.to_string(),
        status: "syntax_ok".to_string(),
        source: "discovery+extract".to_string(),
    }
}
