//! # Interrupt Handling
//!
//! Cooperative stop token shared between the signal handler and the
//! pipeline. The handler only flips the flag; everything else (logging, final
//! flush) happens when the pipeline reaches its next safe point.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    StopRequested,
}

/// Cloneable handle to a single stop flag. Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    inner: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.inner.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    pub fn state(&self) -> RunState {
        if self.is_set() {
            RunState::StopRequested
        } else {
            RunState::Running
        }
    }
}

/// Route Ctrl+C (and SIGTERM on Unix) to `flag`.
///
/// Can only be installed once per process.
pub fn install_interrupt_handler(flag: &StopFlag) -> Result<()> {
    let flag = flag.clone();
    ctrlc::set_handler(move || flag.request_stop())
        .context("failed to install interrupt handler")
}
