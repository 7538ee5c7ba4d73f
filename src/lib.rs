#![no_std]

//! A decoder for Bluetooth LE Cycling Speed and Cadence measurements.
//!
//! Freehub turns the notification payloads of a CSC sensor's measurement
//! characteristic into instantaneous wheel speed (km/h) and crank cadence
//! (rpm). The sensor reports free-running revolution and event-time
//! counters, so deriving a rate means differencing successive samples
//! while handling counter wraparound, coasting, and the duplicate or
//! near-duplicate notifications many sensors emit.
//!
//! The crate performs no I/O. Subscribe to the measurement characteristic
//! however suits your platform, then push each notification's bytes into a
//! [`MeasurementDecoder`] along with a monotonic arrival timestamp in
//! milliseconds. Decoding is synchronous and allocation-free.
//!
//! Notifications must be delivered in arrival order with non-decreasing
//! timestamps. The decoder cannot distinguish an out-of-order sample from
//! a genuine counter rollover, and will treat it as the latter.

pub mod decoder;
pub mod rate;
pub mod rollover;
pub mod wire;

pub use decoder::{DecoderConfig, Measurement, MeasurementDecoder, ResetSummary};
pub use wire::Error;
