//! Randomized delay between per-link operations so outbound requests do not
//! follow a fixed interval.

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Blocking pause inserted by the pipeline between links.
pub trait Pacer: Send + Sync {
    fn pace(&self);
}

/// `base_seconds * U` with `U ~ Uniform[1, jitter_factor]`.
pub fn jittered_delay<R: Rng + ?Sized>(rng: &mut R, base_seconds: f64, jitter_factor: f64) -> Duration {
    if !base_seconds.is_finite() || base_seconds <= 0.0 {
        return Duration::ZERO;
    }
    let upper = if jitter_factor.is_finite() && jitter_factor > 1.0 {
        jitter_factor
    } else {
        1.0
    };
    let factor = if upper > 1.0 {
        rng.gen_range(1.0..=upper)
    } else {
        1.0
    };
    Duration::from_secs_f64(base_seconds * factor)
}

/// Sleep for a jittered interval. Never fails.
pub fn pace(base_seconds: f64, jitter_factor: f64) {
    let delay = jittered_delay(&mut rand::thread_rng(), base_seconds, jitter_factor);
    if !delay.is_zero() {
        debug!("pacing for {:.2}s", delay.as_secs_f64());
        thread::sleep(delay);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JitterPacer {
    pub base_seconds: f64,
    pub jitter_factor: f64,
}

impl JitterPacer {
    pub fn new(base_seconds: f64, jitter_factor: f64) -> Self {
        Self {
            base_seconds,
            jitter_factor,
        }
    }
}

impl Pacer for JitterPacer {
    fn pace(&self) {
        pace(self.base_seconds, self.jitter_factor);
    }
}

/// No delay at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacer;

impl Pacer for NoPacer {
    fn pace(&self) {}
}
