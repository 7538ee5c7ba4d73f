//! Binary layout of the CSC measurement characteristic.
//!
//! A notification starts with a one-byte flags field announcing which of
//! the optional field groups follow. Present groups are packed
//! back-to-back in a fixed order, little-endian, with absent groups
//! contributing no bytes at all:
//!
//! ```text
//!       flags  wheel revs   wheel time  crank revs  crank time
//! (0x)  03    -0c-00-00-00 -44-1a      -02-00      -99-1d
//! ```
//!
//! The frame above (from a Wahoo speed/cadence sensor) carries both
//! groups: 12 cumulative wheel revolutions at event time `0x1a44`, and 2
//! cumulative crank revolutions at event time `0x1d99`. Event times are
//! free-running 16-bit tick counters, not wall-clock values.

use tartan_bitfield::bitfield;
use thiserror::Error;
use zerocopy::FromBytes;

/// Errors occurring while decoding a measurement payload.
#[derive(Debug, Error)]
pub enum Error {
    /// Payload is empty (missing its flags byte).
    #[error("Payload is empty (missing its flags byte).")]
    MissingFlags,
    /// Payload is shorter than its flags byte indicates.
    #[error("Payload is shorter than its flags byte indicates.")]
    EndOfPayload,
}

bitfield! {
    /// The leading flags byte of a measurement notification.
    ///
    /// Bits 0 and 1 announce the wheel and crank field groups; the
    /// remaining bits are reserved.
    pub struct Flags(u8) {
        [0] pub wheel_revolution_data,
        [1] pub crank_revolution_data,
    }
}

/// A conditional field of a measurement notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CumulativeWheelRevolutions,
    LastWheelEventTime,
    CumulativeCrankRevolutions,
    LastCrankEventTime,
}

const FLAGS_SIZE: usize = 1;
const WHEEL_REVOLUTIONS_SIZE: usize = 4;
const WHEEL_EVENT_TIME_SIZE: usize = 2;
const CRANK_REVOLUTIONS_SIZE: usize = 2;

/// Read the flags byte of a payload.
pub fn read_flags(r: &[u8]) -> Result<Flags, Error> {
    r.first().copied().map(Flags).ok_or(Error::MissingFlags)
}

/// Compute the byte offset of a conditional field within a payload.
///
/// Returns `None` if the field's presence bit is not set in `flags`.
/// Offsets depend only on the flags: each is the sum of the sizes of the
/// present fields preceding it in the fixed order.
pub fn field_offset(flags: Flags, field: Field) -> Option<usize> {
    let wheel = flags.wheel_revolution_data();
    let crank = flags.crank_revolution_data();

    let wheel_group = WHEEL_REVOLUTIONS_SIZE + WHEEL_EVENT_TIME_SIZE;

    match field {
        Field::CumulativeWheelRevolutions => wheel.then_some(FLAGS_SIZE),
        Field::LastWheelEventTime => wheel.then_some(FLAGS_SIZE + WHEEL_REVOLUTIONS_SIZE),
        Field::CumulativeCrankRevolutions => {
            crank.then(|| FLAGS_SIZE + if wheel { wheel_group } else { 0 })
        }
        Field::LastCrankEventTime => {
            crank.then(|| FLAGS_SIZE + if wheel { wheel_group } else { 0 } + CRANK_REVOLUTIONS_SIZE)
        }
    }
}

/// The raw wheel field group of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelData {
    /// Cumulative wheel revolutions (free-running, modulo 2^32).
    pub revolutions: u32,
    /// Last wheel event time, in sensor ticks (free-running, modulo 2^16).
    pub event_time: u16,
}

/// The raw crank field group of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrankData {
    /// Cumulative crank revolutions (free-running, modulo 2^16).
    pub revolutions: u16,
    /// Last crank event time, in sensor ticks (free-running, modulo 2^16).
    pub event_time: u16,
}

/// The raw contents of a measurement payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub wheel: Option<WheelData>,
    pub crank: Option<CrankData>,
}

impl Payload {
    /// Extract the raw field groups of a measurement payload.
    ///
    /// Fails without partial results if the payload is shorter than its
    /// flags byte indicates.
    pub fn parse(r: &[u8]) -> Result<Self, Error> {
        let flags = read_flags(r)?;

        let mut i = FLAGS_SIZE; // Cursor of bytes read, starting past the flags.
        let i = &mut i;

        let wheel = if flags.wheel_revolution_data() {
            #[repr(C, packed)]
            #[derive(FromBytes)]
            struct WheelFields {
                revolutions: [u8; 4],
                event_time: [u8; 2],
            }

            let bytes: [u8; 6] = take(r, i)?;
            let WheelFields {
                revolutions,
                event_time,
            } = zerocopy::transmute!(bytes);

            Some(WheelData {
                revolutions: u32::from_le_bytes(revolutions),
                event_time: u16::from_le_bytes(event_time),
            })
        } else {
            None
        };

        let crank = if flags.crank_revolution_data() {
            #[repr(C, packed)]
            #[derive(FromBytes)]
            struct CrankFields {
                revolutions: [u8; 2],
                event_time: [u8; 2],
            }

            let bytes: [u8; 4] = take(r, i)?;
            let CrankFields {
                revolutions,
                event_time,
            } = zerocopy::transmute!(bytes);

            Some(CrankData {
                revolutions: u16::from_le_bytes(revolutions),
                event_time: u16::from_le_bytes(event_time),
            })
        } else {
            None
        };

        Ok(Self { wheel, crank })
    }
}

/// Take an exact number of bytes from an offset in a slice, advancing the offset.
fn take<const N: usize>(r: &[u8], i: &mut usize) -> Result<[u8; N], Error> {
    let s = *i;
    *i += N;

    Ok(r.get(s..*i).ok_or(Error::EndOfPayload)?.try_into().unwrap())
}
