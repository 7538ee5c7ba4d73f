//! Calibration of the noise gate against a sensor's notification rate.
//!
//! Sensors differ widely in how often they notify, so a fixed gate depth
//! suits none of them. A [`RateAdjuster`] watches the arrival timestamps
//! of the first notifications of a session, averages their spacing, and
//! sizes the gate to the number of notifications that fit inside the
//! longest plausible still period. It runs once and then freezes.

/// Minimum calibrated gate depth.
const MIN_GATE_COUNT: u32 = 2;
/// Maximum calibrated gate depth.
const MAX_GATE_COUNT: u32 = 15;

/// Spacing assumed for the first sample, in milliseconds.
const SEED_DELTA_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Collecting,
    Done,
}

/// One-shot observer of inter-notification spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct RateAdjuster {
    cutoff: u32,
    max_still_time_ms: u64,

    samples: u32,
    average_delta_ms: f64,
    previous_ms: Option<u64>,
    status: Status,
}

impl RateAdjuster {
    /// An adjuster collecting `cutoff` samples, sizing the gate to cover
    /// `max_still_time_ms` of repeated notifications.
    pub fn new(cutoff: u32, max_still_time_ms: u64) -> Self {
        Self {
            cutoff,
            max_still_time_ms,
            samples: 0,
            average_delta_ms: 0.0,
            previous_ms: None,
            status: Status::Collecting,
        }
    }

    /// Record a notification arrival timestamp.
    ///
    /// Returns the calibrated gate depth exactly once, on the update that
    /// reaches the sample cutoff. Earlier updates, and any update after
    /// completion, return `None`.
    pub fn update(&mut self, arrival_ms: u64) -> Option<u32> {
        if self.is_done() {
            return None;
        }

        // Running average of consecutive deltas. The first sample has no
        // predecessor and contributes a nominal spacing instead.
        let delta = match self.previous_ms {
            Some(previous) => arrival_ms.saturating_sub(previous) as f64,
            None => SEED_DELTA_MS,
        };

        self.samples += 1;
        self.average_delta_ms += (delta - self.average_delta_ms) / f64::from(self.samples);
        self.previous_ms = Some(arrival_ms);

        if self.samples < self.cutoff {
            return None;
        }

        self.status = Status::Done;
        Some(self.calibrate())
    }

    /// Size the gate from the observed average spacing.
    fn calibrate(&self) -> u32 {
        let fitting = round(self.max_still_time_ms as f64 / self.average_delta_ms);

        (fitting.saturating_sub(1)).clamp(MIN_GATE_COUNT, MAX_GATE_COUNT)
    }

    /// Whether calibration has completed.
    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    /// The number of samples collected so far.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Discard all collected samples and resume collecting.
    pub fn reset(&mut self) {
        self.samples = 0;
        self.average_delta_ms = 0.0;
        self.previous_ms = None;
        self.status = Status::Collecting;
    }
}

/// Round a non-negative value to the nearest integer.
fn round(x: f64) -> u32 {
    (x + 0.5) as u32
}
