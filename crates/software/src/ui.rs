//! Maps the single front-panel knob onto whichever parameter the mode button has selected.
//!
//! Every mode reads the same knob, so switching modes would otherwise snap the new parameter to wherever the knob was
//! left by the old one. Modes therefore use soft pickup: after [`UiMode::select`] the knob is ignored until it moves
//! further than [`DEAD_BAND`] from where it sat, and only then does it take over the parameter.

use crate::{
    configuration::{ModeSelection, Scale},
    io::{CONVERTER_MAX, Sample},
    sequencer::{DEFAULT_RANGE_INDEX, FLIP_DENOMINATOR, FlipProbability, RANGE_DIVISORS},
};
use enum_dispatch::enum_dispatch;
use num_traits::FromPrimitive;

/// How far, in raw knob units, the knob must travel after a mode is selected before it takes effect.
pub const DEAD_BAND: Sample = 64;

/// Largest clock divisor the knob can select.
pub const MAX_DIVISOR: u16 = 16;

/// Resolution of the flip probability knob.
const PROBABILITY_STEPS: u32 = 256;

const SCALE_COUNT: u32 = Scale::HarmonicMinor as u32 + 1;

/// A change requested through the user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Setting {
    /// Clock edges per step.
    Divisor(u16),
    /// Likelihood of the recirculating bit being flipped.
    FlipProbability(FlipProbability),
    /// Index into the octave range table.
    Range(usize),
    /// Scale to quantize to.
    Scale(Scale),
}

/// A parameter the knob can be assigned to.
#[enum_dispatch]
pub trait UiMode {
    /// The setting this mode holds before the knob has been picked up.
    fn init(&self) -> Setting;

    /// Makes this mode the active one, with the knob currently reading `knob`.
    fn select(&mut self, knob: Sample);

    /// Reads the knob, returning a setting when the knob is picked up and its value changes.
    fn update(&mut self, knob: Sample) -> Option<Setting>;
}

/// The knob's pickup state and the last segment it reported.
#[derive(Debug, Default, Clone, Copy)]
struct Knob {
    anchor: Option<Sample>,
    last: Option<u32>,
}

impl Knob {
    fn select(&mut self, knob: Sample) {
        self.anchor = Some(knob);
        self.last = None;
    }

    /// Which of `segments` equal slices of the knob's travel it sits in, once picked up and when that has changed.
    fn read(&mut self, knob: Sample, segments: u32) -> Option<u32> {
        if let Some(anchor) = self.anchor {
            if knob.abs_diff(anchor) <= DEAD_BAND {
                return None;
            }
            self.anchor = None;
        }

        let position = u32::from(knob.min(CONVERTER_MAX));
        let segment = position * segments / (u32::from(CONVERTER_MAX) + 1);
        if self.last == Some(segment) {
            return None;
        }
        self.last = Some(segment);
        Some(segment)
    }
}

/// Knob sets the flip probability, from never at the bottom to almost always at the top.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbabilityMode {
    knob: Knob,
}

impl UiMode for ProbabilityMode {
    fn init(&self) -> Setting {
        Setting::FlipProbability(FlipProbability::default())
    }

    fn select(&mut self, knob: Sample) {
        self.knob.select(knob);
    }

    fn update(&mut self, knob: Sample) -> Option<Setting> {
        let step = self.knob.read(knob, PROBABILITY_STEPS)?;
        let numerator = step * (u32::from(FLIP_DENOMINATOR) / PROBABILITY_STEPS);
        FlipProbability::new(numerator as u16)
            .ok()
            .map(Setting::FlipProbability)
    }
}

/// Knob sets the clock divisor from 1 to [`MAX_DIVISOR`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DivisorMode {
    knob: Knob,
}

impl UiMode for DivisorMode {
    fn init(&self) -> Setting {
        Setting::Divisor(1)
    }

    fn select(&mut self, knob: Sample) {
        self.knob.select(knob);
    }

    fn update(&mut self, knob: Sample) -> Option<Setting> {
        let segment = self.knob.read(knob, u32::from(MAX_DIVISOR))?;
        Some(Setting::Divisor(segment as u16 + 1))
    }
}

/// Knob selects one of the octave ranges, narrowest at the bottom.
#[derive(Debug, Default, Clone, Copy)]
pub struct RangeMode {
    knob: Knob,
}

impl UiMode for RangeMode {
    fn init(&self) -> Setting {
        Setting::Range(DEFAULT_RANGE_INDEX)
    }

    fn select(&mut self, knob: Sample) {
        self.knob.select(knob);
    }

    fn update(&mut self, knob: Sample) -> Option<Setting> {
        let segment = self.knob.read(knob, RANGE_DIVISORS.len() as u32)?;
        Some(Setting::Range(segment as usize))
    }
}

/// Knob sweeps through the scales in [`Scale`] order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScaleMode {
    knob: Knob,
}

impl UiMode for ScaleMode {
    fn init(&self) -> Setting {
        Setting::Scale(Scale::default())
    }

    fn select(&mut self, knob: Sample) {
        self.knob.select(knob);
    }

    fn update(&mut self, knob: Sample) -> Option<Setting> {
        let segment = self.knob.read(knob, SCALE_COUNT)?;
        Scale::from_u32(segment).map(Setting::Scale)
    }
}

/// The knob assignment currently in effect.
#[enum_dispatch(UiMode)]
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// See [`ProbabilityMode`].
    Probability(ProbabilityMode),
    /// See [`DivisorMode`].
    Divisor(DivisorMode),
    /// See [`RangeMode`].
    Range(RangeMode),
    /// See [`ScaleMode`].
    Scale(ScaleMode),
}

impl From<ModeSelection> for Mode {
    fn from(selection: ModeSelection) -> Self {
        match selection {
            ModeSelection::Probability => ProbabilityMode::default().into(),
            ModeSelection::Divisor => DivisorMode::default().into(),
            ModeSelection::Range => RangeMode::default().into(),
            ModeSelection::Scale => ScaleMode::default().into(),
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        ModeSelection::default().into()
    }
}
