//! Errors raised by the signal path.
//!
//! Nothing here is retried. A [`ConfigurationError`] means the requested setup cannot work and should be treated as
//! fatal during start-up; a [`BoundsError`] is recoverable and already carries the value to fall back on.
//!
//! A third failure mode, sampling work that overruns its timer period, is not represented at all: it shows up as jitter
//! on the detected clock and nothing else.

use crate::io::Code;
use core::fmt;

/// A setting that was rejected before it could take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationError {
    /// The timer cannot produce the requested sample rate with any of its prescalers.
    UnrepresentableSampleRate {
        /// The requested rate.
        hz: u32,
    },
    /// A clock divisor of zero would never dispatch a step.
    ZeroDivisor,
    /// The clock was configured without divisor support but a divisor other than 1 was requested.
    DivisorUnsupported,
    /// The low hysteresis threshold lies above the high one.
    InvertedHysteresis {
        /// Requested low threshold.
        low: u16,
        /// Requested high threshold.
        high: u16,
    },
    /// An index past the end of the octave range table.
    RangeOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of entries in the table.
        len: usize,
    },
    /// The octave range table holds a zero divisor at the requested index.
    ZeroRangeDivisor {
        /// Requested index.
        index: usize,
    },
    /// The flip probability numerator is not below its denominator.
    FlipProbabilityOutOfRange {
        /// Requested numerator.
        numerator: u16,
    },
    /// Scale offsets are empty, too long, out of order or outside an octave.
    InvalidScale,
    /// The voltage table is empty, or its codes are not strictly monotonic.
    InvalidVoltageTable,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrepresentableSampleRate { hz } => {
                write!(f, "sample rate of {hz} Hz cannot be produced by the timer")
            }
            Self::ZeroDivisor => f.write_str("clock divisor must be at least 1"),
            Self::DivisorUnsupported => f.write_str("clock divisors are disabled in this configuration"),
            Self::InvertedHysteresis { low, high } => {
                write!(f, "hysteresis low threshold {low} is above high threshold {high}")
            }
            Self::RangeOutOfBounds { index, len } => {
                write!(f, "range index {index} is outside a table of {len} entries")
            }
            Self::ZeroRangeDivisor { index } => write!(f, "range divisor at index {index} is zero"),
            Self::FlipProbabilityOutOfRange { numerator } => {
                write!(f, "flip probability {numerator}/32768 is not below 1")
            }
            Self::InvalidScale => f.write_str("scale offsets are not a valid ascending octave"),
            Self::InvalidVoltageTable => f.write_str("voltage table is not strictly monotonic"),
        }
    }
}

/// A note landed outside the voltage table.
///
/// Rather than reading past the table, the lookup clamps to the nearest valid index and reports the clamp through this
/// error, which carries the code that index maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoundsError {
    /// The index that was requested.
    pub index: usize,
    /// The last valid index of the table.
    pub max_index: usize,
    /// The code stored at `max_index`.
    pub clamped_code: Code,
}

impl fmt::Display for BoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table index {} exceeds {}; clamped to code {}",
            self.index, self.max_index, self.clamped_code
        )
    }
}
