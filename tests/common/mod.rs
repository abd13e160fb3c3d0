//! Shared test infrastructure for pipeline tests.
//!
//! Scripted collaborators stand in for discovery, extraction and validation so
//! runs are deterministic and record what the pipeline asked for.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use leadsweep::checkpoint::{self, CheckpointState};
use leadsweep::config::Config;
use leadsweep::export::{ExportFormat, ResultRow};
use leadsweep::pacing::{NoPacer, Pacer};
use leadsweep::pipeline::{self, PipelineStats};
use leadsweep::seen_set::SeenSets;
use leadsweep::shutdown::StopFlag;
use leadsweep::sources::{
    Collaborators, DiscoveryRequest, EmailExtractor, LinkDiscovery, LinkRecord, Validity,
    ValidityChecker,
};

// ============================================================================
// Fixture
// ============================================================================

pub struct Fixture {
    pub dir: TempDir,
    pub cfg: Config,
}

pub fn fixture(chunk_size: usize, daily_limit: u64) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    let cfg = Config {
        locations_file: root.join("locations.yaml"),
        search_terms: vec!["clinic".to_string()],
        max_cards_per_location: 50,
        scroll_rounds: 1,
        headless: true,
        max_details_per_location: 50,
        daily_limit,
        chunk_size,
        pause_seconds: 0.0,
        pause_jitter: 1.0,
        smtp_verify: false,
        resume: true,
        output_base: root.join("out"),
        log_dir: root.join("logs"),
        suppression_file: root.join("data").join("suppression.txt"),
        seen_emails_file: root.join("data").join("seen_emails.txt"),
        seen_urls_file: root.join("data").join("seen_urls.txt"),
        state_file: root.join("data").join("state.json"),
        links_file: root.join("links.csv"),
        request_timeout_secs: 5,
        export_format: ExportFormat::Csv,
    };
    Fixture { dir, cfg }
}

impl Fixture {
    pub fn load_sets(&self) -> SeenSets {
        SeenSets::load(
            &self.cfg.suppression_file,
            &self.cfg.seen_emails_file,
            &self.cfg.seen_urls_file,
        )
        .expect("load sets")
    }

    pub fn write_lines(&self, path: &Path, lines: &[&str]) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(path, content).expect("write lines");
    }

    pub fn checkpoint(&self) -> Option<CheckpointState> {
        checkpoint::load_checkpoint(&self.cfg.state_file).ok()
    }

    pub fn resume_state(&self) -> Option<CheckpointState> {
        checkpoint::resume_state(&self.cfg.state_file, self.cfg.resume, "2000-01-01")
    }

    pub fn chunk_files(&self) -> Vec<PathBuf> {
        files_containing(&self.cfg.output_base, "_chunk")
    }

    pub fn partial_files(&self) -> Vec<PathBuf> {
        files_containing(&self.cfg.output_base, "_part")
    }

    pub fn chunk_rows(&self) -> Vec<ResultRow> {
        self.chunk_files().iter().flat_map(|p| read_rows(p)).collect()
    }

    pub fn run(
        &self,
        locations: &[&str],
        discovery: &dyn LinkDiscovery,
        extractor: &dyn EmailExtractor,
        validator: &dyn ValidityChecker,
        pacer: &dyn Pacer,
        stop: &StopFlag,
        resume: Option<CheckpointState>,
    ) -> Result<PipelineStats> {
        let locations: Vec<String> = locations.iter().map(|l| l.to_string()).collect();
        let mut sets = self.load_sets();
        pipeline::run_pipeline(
            &self.cfg,
            &locations,
            Collaborators {
                discovery,
                extractor,
                validator,
            },
            &mut sets,
            pacer,
            stop,
            resume,
        )
    }

    /// Fresh run with no pacing and no resume.
    pub fn run_simple(
        &self,
        locations: &[&str],
        discovery: &dyn LinkDiscovery,
        extractor: &dyn EmailExtractor,
    ) -> Result<PipelineStats> {
        self.run(
            locations,
            discovery,
            extractor,
            &AcceptAll,
            &NoPacer,
            &StopFlag::new(),
            None,
        )
    }
}

pub fn files_containing(dir: &Path, marker: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().contains(marker))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

pub fn read_rows(path: &Path) -> Vec<ResultRow> {
    let mut reader = csv::Reader::from_path(path).expect("csv reader");
    reader
        .deserialize()
        .collect::<Result<Vec<ResultRow>, _>>()
        .expect("rows")
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .expect("file name")
        .to_string_lossy()
        .to_string()
}

// ============================================================================
// Scripted collaborators
// ============================================================================

/// Discovery returning fixed links per location; records each request.
#[derive(Default)]
pub struct ScriptedDiscovery {
    links: HashMap<String, Vec<LinkRecord>>,
    pub calls: RefCell<Vec<String>>,
    /// Checkpoint file contents at the moment of each call.
    pub probe_path: Option<PathBuf>,
    pub probes: RefCell<Vec<Option<CheckpointState>>>,
}

impl ScriptedDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, urls: &[&str]) -> Self {
        let records = urls
            .iter()
            .map(|u| LinkRecord::new(u, &format!("Name of {u}")))
            .collect();
        self.links.insert(location.to_string(), records);
        self
    }

    pub fn probing(mut self, state_file: &Path) -> Self {
        self.probe_path = Some(state_file.to_path_buf());
        self
    }
}

impl LinkDiscovery for ScriptedDiscovery {
    fn discover(&self, request: &DiscoveryRequest<'_>) -> Result<Vec<LinkRecord>> {
        self.calls.borrow_mut().push(request.location.to_string());
        if let Some(path) = &self.probe_path {
            self.probes
                .borrow_mut()
                .push(checkpoint::load_checkpoint(path).ok());
        }
        Ok(self
            .links
            .get(request.location)
            .map(|l| l.iter().take(request.max_cards).cloned().collect())
            .unwrap_or_default())
    }
}

/// Extraction returning fixed emails per url; can be told to fail on a url.
#[derive(Default)]
pub struct ScriptedExtractor {
    emails: HashMap<String, Vec<String>>,
    pub calls: RefCell<Vec<String>>,
    pub fail_on: Option<String>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, emails: &[&str]) -> Self {
        self.emails
            .insert(url.to_string(), emails.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.fail_on = Some(url.to_string());
        self
    }
}

impl EmailExtractor for ScriptedExtractor {
    fn extract_emails(&self, url: &str) -> Result<Vec<String>> {
        self.calls.borrow_mut().push(url.to_string());
        if self.fail_on.as_deref() == Some(url) {
            return Err(anyhow!("extractor exploded on {url}"));
        }
        Ok(self.emails.get(url).cloned().unwrap_or_default())
    }
}

pub struct AcceptAll;

impl ValidityChecker for AcceptAll {
    fn check(&self, _email: &str, _do_smtp_check: bool) -> Result<Validity> {
        Ok(Validity::pass("ok"))
    }
}

/// Rejects the listed addresses; accepts everything else.
pub struct RejectListed(pub Vec<String>);

impl ValidityChecker for RejectListed {
    fn check(&self, email: &str, _do_smtp_check: bool) -> Result<Validity> {
        if self.0.iter().any(|e| e == email) {
            Ok(Validity::fail("rejected"))
        } else {
            Ok(Validity::pass("ok"))
        }
    }
}

/// Pacer that raises the stop flag on its `after`-th call, like a Ctrl+C
/// arriving between two links.
pub struct StopAfterPaces {
    pub stop: StopFlag,
    pub after: usize,
    pub count: AtomicUsize,
}

impl StopAfterPaces {
    pub fn new(stop: &StopFlag, after: usize) -> Self {
        Self {
            stop: stop.clone(),
            after,
            count: AtomicUsize::new(0),
        }
    }
}

impl Pacer for StopAfterPaces {
    fn pace(&self) {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.after {
            self.stop.request_stop();
        }
    }
}
