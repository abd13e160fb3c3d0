//! # Pipeline Module
//!
//! Drives a run: locations in order, each location's discovered links in
//! order, each link's extracted emails in order. Everything is sequential;
//! the stop flag is only consulted at the top of each of the three loops.
//!
//! Per location the controller
//! - skips links already in the seen-url set and marks new ones before
//!   extraction, so a URL is never fetched twice across runs,
//! - drops suppressed, already-seen and invalid emails,
//! - buffers accepted rows both for the location and for the run,
//! - writes the location's rows as one partial file,
//! - saves a checkpoint pointing at the next location.
//!
//! Chunk files are flushed whenever the running total hits a multiple of
//! `chunk_size`, and once more when the run ends for any reason.

pub mod stats;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::checkpoint::{CheckpointState, save_checkpoint};
use crate::config::Config;
use crate::export::{ChunkedExporter, ResultRow, export_location_partial, next_part_index};
use crate::pacing::Pacer;
use crate::seen_set::{SeenSets, normalize_email};
use crate::shutdown::StopFlag;
use crate::sources::{Collaborators, DiscoveryRequest, LinkRecord};
use crate::util::today_slug;

pub use stats::{PipelineStats, Termination};

/// Provenance tag stored on every row.
pub const ROW_SOURCE: &str = "discovery+extract";

/// Prefix of the run-wide chunk files for a given day.
pub fn chunk_prefix(date: &str) -> String {
    format!("leads_{date}")
}

/// Run the pipeline over `locations`.
///
/// `resume` is the checkpoint to continue from, if any. The returned stats
/// carry the running total in `captured`. On an unexpected error a
/// best-effort final flush is attempted, the summary is logged with
/// `termination=fault`, and the error is returned for the caller to report.
pub fn run_pipeline(
    cfg: &Config,
    locations: &[String],
    collaborators: Collaborators<'_>,
    sets: &mut SeenSets,
    pacer: &dyn Pacer,
    stop: &StopFlag,
    resume: Option<CheckpointState>,
) -> Result<PipelineStats> {
    PipelineRunner::new(cfg, locations, collaborators, sets, pacer, stop, resume)?.run()
}

struct PipelineRunner<'a> {
    cfg: &'a Config,
    locations: &'a [String],
    collaborators: Collaborators<'a>,
    sets: &'a mut SeenSets,
    pacer: &'a dyn Pacer,
    stop: StopFlag,
    today: String,
    exporter: ChunkedExporter,
    part_index: usize,
    hit_daily_limit: bool,
    stats: PipelineStats,
}

impl<'a> PipelineRunner<'a> {
    fn new(
        cfg: &'a Config,
        locations: &'a [String],
        collaborators: Collaborators<'a>,
        sets: &'a mut SeenSets,
        pacer: &'a dyn Pacer,
        stop: &StopFlag,
        resume: Option<CheckpointState>,
    ) -> Result<Self> {
        let today = today_slug();
        let exporter = ChunkedExporter::new(
            &cfg.output_base,
            &chunk_prefix(&today),
            cfg.chunk_size,
            cfg.export_format,
        )
        .context("failed to prepare chunk exporter")?;

        let part_index = next_part_index(&cfg.output_base)
            .context("failed to scan existing location partials")?;

        let (start_index, captured) = match resume {
            Some(state) => (state.location_index, state.captured_count),
            None => (0, 0),
        };

        Ok(Self {
            cfg,
            locations,
            collaborators,
            sets,
            pacer,
            stop: stop.clone(),
            today,
            exporter,
            part_index,
            hit_daily_limit: false,
            stats: PipelineStats::new(start_index, captured),
        })
    }

    fn run(mut self) -> Result<PipelineStats> {
        info!(
            "run_start locations={} start_index={} captured={} daily_limit={} chunk_size={}",
            self.locations.len(),
            self.stats.start_index,
            self.stats.captured,
            self.cfg.daily_limit,
            self.cfg.chunk_size
        );

        let outcome = self.location_loop();
        let flushed = self.exporter.flush();
        self.stats.chunk_files = self.exporter.written().len() as u64;

        match outcome {
            Ok(()) => {
                flushed.context("final chunk flush failed")?;
                self.stats.termination = if self.hit_daily_limit {
                    Termination::DailyLimit
                } else if self.stop.is_set() {
                    Termination::Interrupted
                } else {
                    Termination::Completed
                };
                self.log_summary();
                Ok(self.stats)
            }
            Err(err) => {
                if let Err(flush_err) = flushed {
                    warn!(
                        "final chunk flush failed; {} rows not exported: {flush_err}",
                        self.exporter.pending_len()
                    );
                }
                self.stats.termination = Termination::Fault;
                self.log_summary();
                Err(err)
            }
        }
    }

    fn location_loop(&mut self) -> Result<()> {
        if self.stats.captured >= self.cfg.daily_limit {
            info!(
                "daily limit {} already reached (captured={}); nothing to do",
                self.cfg.daily_limit, self.stats.captured
            );
            self.hit_daily_limit = true;
            return Ok(());
        }
        if self.stats.start_index >= self.locations.len() {
            info!(
                "checkpoint index {} is past the last location; nothing to do",
                self.stats.start_index
            );
            return Ok(());
        }

        let locations = self.locations;
        for index in self.stats.start_index..locations.len() {
            if self.stop.is_set() {
                break;
            }
            let location = &locations[index];
            self.process_location(index, location)
                .with_context(|| format!("location {index} ({location}) failed"))?;
            if self.stop.is_set() {
                break;
            }
        }
        Ok(())
    }

    fn process_location(&mut self, index: usize, location: &str) -> Result<()> {
        info!(
            "location_start index={} of={} location={}",
            index + 1,
            self.locations.len(),
            location
        );

        let cfg = self.cfg;
        let request = DiscoveryRequest {
            location,
            search_terms: &cfg.search_terms,
            max_cards: cfg.max_cards_per_location,
            scroll_rounds: cfg.scroll_rounds,
            headless: cfg.headless,
        };
        let links = self
            .collaborators
            .discovery
            .discover(&request)
            .context("link discovery failed")?;
        self.stats.links_discovered += links.len() as u64;
        info!("links_discovered location={} count={}", location, links.len());

        let mut location_rows = Vec::new();
        let mut attempts = 0usize;
        for (position, link) in links.iter().enumerate() {
            if self.stop.is_set() {
                break;
            }
            if self.sets.urls.contains(&link.url) {
                self.stats.links_skipped_seen += 1;
                continue;
            }
            self.sets
                .urls
                .insert(&link.url)
                .context("failed to record seen url")?;

            if attempts >= self.cfg.max_details_per_location {
                info!(
                    "detail cap {} reached for location={}",
                    self.cfg.max_details_per_location, location
                );
                break;
            }
            attempts += 1;
            self.stats.extraction_attempts += 1;
            debug!("link {}/{} url={}", position + 1, links.len(), link.url);

            let emails = self
                .collaborators
                .extractor
                .extract_emails(&link.url)
                .with_context(|| format!("email extraction failed for {}", link.url))?;
            self.stats.emails_found += emails.len() as u64;

            for raw in &emails {
                if self.stop.is_set() {
                    break;
                }
                self.consider_email(location, link, raw, &mut location_rows)?;
            }

            if !self.stop.is_set() {
                self.pacer.pace();
            }
        }

        if !location_rows.is_empty() {
            let path = export_location_partial(
                &location_rows,
                &self.cfg.output_base,
                location,
                self.part_index,
                self.cfg.export_format,
            )
            .context("failed to write location partial")?;
            info!(
                "partial_saved location={} rows={} path={}",
                location,
                location_rows.len(),
                path.display()
            );
            self.part_index += 1;
            self.stats.partial_files += 1;
        }

        let state = CheckpointState::new(index + 1, self.stats.captured, &self.today);
        save_checkpoint(&self.cfg.state_file, &state).with_context(|| {
            format!("failed to write checkpoint {}", self.cfg.state_file.display())
        })?;
        self.stats.locations_completed += 1;
        info!(
            "location_done location={} rows={} captured={} next_index={}",
            location,
            location_rows.len(),
            self.stats.captured,
            index + 1
        );
        Ok(())
    }

    fn consider_email(
        &mut self,
        location: &str,
        link: &LinkRecord,
        raw: &str,
        location_rows: &mut Vec<ResultRow>,
    ) -> Result<()> {
        let email = normalize_email(raw);
        if email.is_empty() {
            return Ok(());
        }
        if self.sets.suppression.contains(&email) {
            self.stats.emails_suppressed += 1;
            return Ok(());
        }
        if self.sets.emails.contains(&email) {
            self.stats.emails_duplicate += 1;
            return Ok(());
        }

        let validity = self
            .collaborators
            .validator
            .check(&email, self.cfg.smtp_verify)
            .with_context(|| format!("validity check failed for {email}"))?;
        if !validity.valid {
            debug!("rejected email={} status={}", email, validity.status);
            self.stats.emails_invalid += 1;
            return Ok(());
        }

        let row = ResultRow {
            timestamp: chrono::Utc::now().to_rfc3339(),
            location: location.to_string(),
            display_name: link.display_name.clone(),
            url: link.url.clone(),
            email: email.clone(),
            status: validity.status,
            source: ROW_SOURCE.to_string(),
        };
        location_rows.push(row.clone());
        self.exporter.push(row);

        self.sets
            .emails
            .insert(&email)
            .context("failed to record seen email")?;

        self.stats.captured += 1;
        self.stats.captured_this_run += 1;

        if self.stats.captured % self.cfg.chunk_size as u64 == 0 {
            self.exporter.flush().context("chunk flush failed")?;
            info!("chunk checkpoint saved captured={}", self.stats.captured);
        }

        if self.stats.captured >= self.cfg.daily_limit {
            info!("daily limit {} reached; stopping", self.cfg.daily_limit);
            self.hit_daily_limit = true;
            self.stop.request_stop();
        }
        Ok(())
    }

    fn log_summary(&self) {
        let s = &self.stats;
        if s.termination == Termination::Interrupted {
            warn!("stop requested; saved progress and stopped at a safe point");
        }
        info!(
            "run_summary termination={} captured={} captured_this_run={} locations_completed={} links_discovered={} links_skipped_seen={} extraction_attempts={} emails_found={} suppressed={} duplicate={} invalid={} partial_files={} chunk_files={}",
            s.termination,
            s.captured,
            s.captured_this_run,
            s.locations_completed,
            s.links_discovered,
            s.links_skipped_seen,
            s.extraction_attempts,
            s.emails_found,
            s.emails_suppressed,
            s.emails_duplicate,
            s.emails_invalid,
            s.partial_files,
            s.chunk_files
        );
    }
}
