//! The engine's one piece of mutable state: the confidence threshold.
//!
//! Readers load it once per record decision. Writers go through a
//! compare-and-swap loop, so concurrent adjustments each apply exactly one
//! step and none is lost.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub const MIN_THRESHOLD: f64 = 0.6;
pub const MAX_THRESHOLD: f64 = 0.9;
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Size of one adjustment.
pub const THRESHOLD_STEP: f64 = 0.05;

/// Above this accuracy the threshold is loosened by one step.
pub const HIGH_ACCURACY_TARGET: f64 = 0.95;

/// Below this accuracy the threshold is tightened by one step.
pub const LOW_ACCURACY_TARGET: f64 = 0.85;

/// External accuracy signal, e.g. from a reviewer's spot check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyFeedback {
    pub accuracy: f64,
}

/// Rounds to two decimals and clamps into `[MIN_THRESHOLD, MAX_THRESHOLD]`.
/// Non-finite input falls back to the default.
pub fn clamp_threshold(value: f64) -> f64 {
    if !value.is_finite() {
        return DEFAULT_THRESHOLD;
    }
    ((value * 100.0).round() / 100.0).clamp(MIN_THRESHOLD, MAX_THRESHOLD)
}

/// One adjustment step from `current` given an observed accuracy.
pub fn next_threshold(current: f64, accuracy: f64) -> f64 {
    if accuracy > HIGH_ACCURACY_TARGET {
        clamp_threshold(current - THRESHOLD_STEP)
    } else if accuracy < LOW_ACCURACY_TARGET {
        clamp_threshold(current + THRESHOLD_STEP)
    } else {
        clamp_threshold(current)
    }
}

/// Shared, atomically updated threshold cell.
#[derive(Debug)]
pub struct ConfidenceThreshold {
    bits: AtomicU64,
}

impl ConfidenceThreshold {
    pub fn new(initial: f64) -> Self {
        ConfidenceThreshold {
            bits: AtomicU64::new(clamp_threshold(initial).to_bits()),
        }
    }

    /// Current value.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Replaces the value, clamped. Returns what was stored.
    pub fn set(&self, value: f64) -> f64 {
        let clamped = clamp_threshold(value);
        self.bits.store(clamped.to_bits(), Ordering::Release);
        clamped
    }

    /// Applies one feedback step and returns the new threshold.
    ///
    /// A non-finite accuracy leaves the threshold unchanged.
    pub fn adjust(&self, feedback: AccuracyFeedback) -> f64 {
        if !feedback.accuracy.is_finite() {
            warn!("Ignoring non-finite accuracy feedback {}", feedback.accuracy);
            return self.get();
        }

        let previous = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(next_threshold(f64::from_bits(bits), feedback.accuracy).to_bits())
            })
            // closure never returns None
            .unwrap_or_else(|bits| bits);
        let previous = f64::from_bits(previous);
        let current = next_threshold(previous, feedback.accuracy);

        if current != previous {
            info!(
                "Confidence threshold {:.2} -> {:.2} (accuracy {:.3})",
                previous, current, feedback.accuracy
            );
        }
        current
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
