//! # Pipeline Statistics
//!
//! Counters collected while a run walks its locations, and the reason the run
//! ended.

use std::fmt;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every remaining location was processed.
    Completed,
    /// The stop flag was raised by the interrupt handler.
    Interrupted,
    /// The running total reached `daily_limit`.
    DailyLimit,
    /// An unexpected error ended the run.
    Fault,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::Interrupted => "interrupted",
            Termination::DailyLimit => "daily_limit",
            Termination::Fault => "fault",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    /// Location index the run started from (after resume).
    pub start_index: usize,
    pub locations_completed: u64,
    pub links_discovered: u64,
    pub links_skipped_seen: u64,
    pub extraction_attempts: u64,
    pub emails_found: u64,
    pub emails_suppressed: u64,
    pub emails_duplicate: u64,
    pub emails_invalid: u64,
    /// Rows accepted by this run alone.
    pub captured_this_run: u64,
    /// Running total including any resumed count.
    pub captured: u64,
    pub partial_files: u64,
    pub chunk_files: u64,
    pub termination: Termination,
}

impl PipelineStats {
    pub fn new(start_index: usize, captured: u64) -> Self {
        Self {
            start_index,
            locations_completed: 0,
            links_discovered: 0,
            links_skipped_seen: 0,
            extraction_attempts: 0,
            emails_found: 0,
            emails_suppressed: 0,
            emails_duplicate: 0,
            emails_invalid: 0,
            captured_this_run: 0,
            captured,
            partial_files: 0,
            chunk_files: 0,
            termination: Termination::Completed,
        }
    }
}
