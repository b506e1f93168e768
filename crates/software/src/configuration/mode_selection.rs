use num_derive::{FromPrimitive, ToPrimitive};

/// Selects which parameter the front-panel knob adjusts.
///
/// See [`Mode`](crate::ui::Mode) for what each selection does with the knob.
#[derive(Debug, Default, Clone, Copy, ToPrimitive, FromPrimitive, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeSelection {
    /// Likelihood of the recirculating bit being flipped.
    #[default]
    Probability,
    /// How many clock edges make one step.
    Divisor,
    /// How many octaves the sequence spans.
    Range,
    /// Which scale notes snap to.
    Scale,
}
impl super::CycleConfig for ModeSelection {}
