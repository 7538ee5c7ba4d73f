//! Rate derivation over a free-running revolution counter.
//!
//! A CSC sensor does not report speed or cadence directly. It reports a
//! cumulative revolution count and the tick time of the last revolution,
//! both wrapping at fixed moduli, and both subject to transmission noise:
//! many sensors re-notify the same event several times, or notify faster
//! than a revolution can physically occur. A [`RolloverCounter`] holds the
//! previous accepted sample for one channel and converts each new sample
//! into an instantaneous rate, suppressing noise through a bounded gate.

/// Wheel event timestamps tick at 1/2048 s.
pub const WHEEL_TIME_RESOLUTION: f64 = 2048.0;
/// Crank event timestamps tick at 1/1024 s.
pub const CRANK_TIME_RESOLUTION: f64 = 1024.0;

/// Wheel revolution counts wrap at 2^32.
pub const WHEEL_REVOLUTIONS_MODULUS: u64 = 1 << 32;
/// Crank revolution counts wrap at 2^16.
pub const CRANK_REVOLUTIONS_MODULUS: u64 = 1 << 16;

/// Event timestamps wrap at 2^16 on both channels.
pub const EVENT_TIME_MODULUS: u64 = 1 << 16;

/// Gate maximum applied before calibration completes.
pub const DEFAULT_MAX_GATE_COUNT: u32 = 3;

/// Conversion from revolutions per second into a channel's final units.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Transform {
    /// Kilometres per hour, rounded to two decimals.
    Speed { circumference_m: f64 },
    /// Revolutions per minute, rounded to an integer.
    Cadence,
}

impl Transform {
    fn apply(&self, revolutions_per_second: f64) -> f64 {
        match *self {
            Self::Speed { circumference_m } => {
                round_to(revolutions_per_second * circumference_m * 3.6, 100.0)
            }
            Self::Cadence => round_to(revolutions_per_second * 60.0, 1.0),
        }
    }
}

/// The previously accepted sample of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Previous {
    revolutions: u32,
    event_time: u16,
    arrival_ms: u64,
}

/// Rate derivation state for one channel (wheel or crank).
#[derive(Debug, Clone, PartialEq)]
pub struct RolloverCounter {
    resolution: f64,
    revolutions_modulus: u64,
    time_modulus: u64,
    transform: Transform,

    gate_window_ms: u64,
    max_gate_count: u32,
    gate_count: u32,

    previous: Option<Previous>,
    value: f64,
}

impl RolloverCounter {
    /// A counter for the wheel channel, producing km/h.
    pub fn wheel(circumference_m: f64, gate_window_ms: u64) -> Self {
        Self::new(
            WHEEL_TIME_RESOLUTION,
            WHEEL_REVOLUTIONS_MODULUS,
            Transform::Speed { circumference_m },
            gate_window_ms,
        )
    }

    /// A counter for the crank channel, producing rpm.
    pub fn crank(gate_window_ms: u64) -> Self {
        Self::new(
            CRANK_TIME_RESOLUTION,
            CRANK_REVOLUTIONS_MODULUS,
            Transform::Cadence,
            gate_window_ms,
        )
    }

    fn new(
        resolution: f64,
        revolutions_modulus: u64,
        transform: Transform,
        gate_window_ms: u64,
    ) -> Self {
        Self {
            resolution,
            revolutions_modulus,
            time_modulus: EVENT_TIME_MODULUS,
            transform,
            gate_window_ms,
            max_gate_count: DEFAULT_MAX_GATE_COUNT,
            gate_count: 0,
            previous: None,
            value: 0.0,
        }
    }

    /// Derive a rate from the next sample of this channel.
    ///
    /// `revolutions` and `event_time` are the raw counter values from the
    /// payload; `arrival_ms` is a monotonic timestamp for the notification
    /// carrying them. Returns the channel's value in its final units:
    /// unchanged while the sample is gated, zero while the counter is not
    /// advancing, and a freshly computed rate otherwise.
    pub fn update(&mut self, revolutions: u32, event_time: u16, arrival_ms: u64) -> f64 {
        // The first sample only seeds the differencing state.
        let Some(previous) = self.previous else {
            self.previous = Some(Previous {
                revolutions,
                event_time,
                arrival_ms,
            });
            return self.value;
        };

        if self.gated(event_time, arrival_ms, &previous) {
            return self.value;
        }

        if revolutions == previous.revolutions {
            // Coasting or stopped: hold the raw state, report no rate.
            self.previous = Some(Previous {
                revolutions,
                event_time,
                arrival_ms,
            });
            self.value = 0.0;
            return self.value;
        }

        // Un-wrap the previous counters so the deltas come out small and
        // positive. An out-of-order sample is indistinguishable from a
        // rollover here and is treated as one.
        let mut previous_time = i64::from(previous.event_time);
        if event_time < previous.event_time {
            previous_time -= self.time_modulus as i64;
        }

        let mut previous_revolutions = i64::from(previous.revolutions);
        if revolutions < previous.revolutions {
            previous_revolutions -= self.revolutions_modulus as i64;
        }

        let revolution_delta = (i64::from(revolutions) - previous_revolutions) as f64;
        let seconds = (i64::from(event_time) - previous_time) as f64 / self.resolution;

        self.value = self.transform.apply(revolution_delta / seconds);
        self.previous = Some(Previous {
            revolutions,
            event_time,
            arrival_ms,
        });

        self.value
    }

    /// Whether to suppress this sample as transmission noise.
    ///
    /// A sample repeating the previous event time, or arriving within the
    /// gate window of the previous acceptance, is gated; after
    /// `max_gate_count` consecutive gated samples the gate is forced open
    /// for one call so sustained noise cannot pin the value forever.
    fn gated(&mut self, event_time: u16, arrival_ms: u64, previous: &Previous) -> bool {
        if self.gate_count >= self.max_gate_count {
            self.gate_count = 0;
            return false;
        }

        if event_time == previous.event_time
            || arrival_ms.saturating_sub(previous.arrival_ms) < self.gate_window_ms
        {
            self.gate_count += 1;
            return true;
        }

        self.gate_count = 0;
        false
    }

    /// The last derived value, in the channel's final units.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The maximum number of consecutively gated samples.
    pub fn max_gate_count(&self) -> u32 {
        self.max_gate_count
    }

    /// Set the maximum number of consecutively gated samples.
    ///
    /// Applied by the decoder once notification-rate calibration
    /// completes.
    pub fn set_max_gate_count(&mut self, count: u32) {
        self.max_gate_count = count;
    }

    /// Change the wheel circumference used for the speed transform.
    ///
    /// Has no effect on a crank channel.
    pub fn set_circumference(&mut self, circumference_m: f64) {
        if let Transform::Speed {
            circumference_m: ref mut current,
        } = self.transform
        {
            *current = circumference_m;
        }
    }

    /// Clear the differencing state, returning the prior raw sample.
    pub fn reset(&mut self) -> Option<(u32, u16)> {
        self.gate_count = 0;
        self.value = 0.0;

        self.previous
            .take()
            .map(|p| (p.revolutions, p.event_time))
    }
}

/// Round a non-negative value to the nearest multiple of `1 / precision`.
fn round_to(x: f64, precision: f64) -> f64 {
    ((x * precision + 0.5) as i64) as f64 / precision
}
