//! Per-session decoding of measurement notifications.

use log::debug;

use crate::rate::RateAdjuster;
use crate::rollover::{DEFAULT_MAX_GATE_COUNT, RolloverCounter};
use crate::wire::{Error, Payload};

/// Configuration for a [`MeasurementDecoder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfig {
    /// Wheel circumference in metres, for the speed conversion.
    pub wheel_circumference_m: f64,
    /// Number of notifications observed before the noise gate is sized.
    pub calibration_cutoff: u32,
    /// Longest period of repeated notifications a still bike should
    /// produce, in milliseconds.
    pub max_still_time_ms: u64,
    /// Minimum spacing below which a notification is gated as noise, in
    /// milliseconds.
    pub gate_window_ms: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            // 700x25c tyre.
            wheel_circumference_m: 2.105,
            calibration_cutoff: 20,
            max_still_time_ms: 3000,
            gate_window_ms: 500,
        }
    }
}

/// A decoded measurement notification.
///
/// Each pair of raw fields, and the rate derived from it, is present
/// exactly when the corresponding flag bit was set in the payload.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub wheel_revolutions: Option<u32>,
    pub wheel_event_time: Option<u16>,
    /// Instantaneous wheel speed, in km/h.
    pub speed_kmh: Option<f64>,

    pub crank_revolutions: Option<u16>,
    pub crank_event_time: Option<u16>,
    /// Instantaneous crank cadence, in rpm.
    pub cadence_rpm: Option<f64>,
}

/// The raw channel state discarded by a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSummary {
    /// Prior wheel (revolutions, event time), if any sample was held.
    pub wheel: Option<(u32, u16)>,
    /// Prior crank (revolutions, event time), if any sample was held.
    pub crank: Option<(u32, u16)>,
}

/// Decoder for one sensor session.
///
/// Construct one per connection and feed it every measurement
/// notification, in arrival order, with a monotonic timestamp. Discard it
/// on disconnect, or [`reset`](Self::reset) it to reuse the allocation-free
/// state for a new session.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementDecoder {
    wheel: RolloverCounter,
    crank: RolloverCounter,
    adjuster: RateAdjuster,
}

impl MeasurementDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            wheel: RolloverCounter::wheel(config.wheel_circumference_m, config.gate_window_ms),
            crank: RolloverCounter::crank(config.gate_window_ms),
            adjuster: RateAdjuster::new(config.calibration_cutoff, config.max_still_time_ms),
        }
    }

    /// Decode one measurement notification.
    ///
    /// `arrival_ms` is a monotonic timestamp for the notification, used
    /// for noise gating and gate calibration. The payload is parsed in
    /// full before any state is touched, so a malformed payload leaves the
    /// decoder exactly as it was.
    pub fn decode(&mut self, r: &[u8], arrival_ms: u64) -> Result<Measurement, Error> {
        let payload = Payload::parse(r)?;

        let mut measurement = Measurement::default();

        if let Some(wheel) = payload.wheel {
            measurement.wheel_revolutions = Some(wheel.revolutions);
            measurement.wheel_event_time = Some(wheel.event_time);
            measurement.speed_kmh =
                Some(self.wheel.update(wheel.revolutions, wheel.event_time, arrival_ms));
        }

        if let Some(crank) = payload.crank {
            measurement.crank_revolutions = Some(crank.revolutions);
            measurement.crank_event_time = Some(crank.event_time);
            measurement.cadence_rpm = Some(self.crank.update(
                u32::from(crank.revolutions),
                crank.event_time,
                arrival_ms,
            ));
        }

        if let Some(gate) = self.adjuster.update(arrival_ms) {
            debug!("calibrated noise gate to {gate} consecutive notifications");
            self.wheel.set_max_gate_count(gate);
            self.crank.set_max_gate_count(gate);
        }

        Ok(measurement)
    }

    /// Change the wheel circumference used for the speed conversion.
    pub fn set_wheel_circumference(&mut self, circumference_m: f64) {
        self.wheel.set_circumference(circumference_m);
    }

    /// Restore the decoder to its initial state, for a new session.
    ///
    /// Both channels, the gate calibration, and the gate depth itself are
    /// cleared; the summary reports the raw state each channel held.
    pub fn reset(&mut self) -> ResetSummary {
        let summary = ResetSummary {
            wheel: self.wheel.reset(),
            crank: self.crank.reset(),
        };

        self.wheel.set_max_gate_count(DEFAULT_MAX_GATE_COUNT);
        self.crank.set_max_gate_count(DEFAULT_MAX_GATE_COUNT);
        self.adjuster.reset();

        debug!("decoder reset");

        summary
    }
}
