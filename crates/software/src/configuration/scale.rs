use crate::quantizer::ScaleTable;
use num_derive::{FromPrimitive, ToPrimitive};

/// The musical scale notes are quantized to.
#[derive(Debug, Default, Clone, Copy, ToPrimitive, FromPrimitive, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scale {
    /// All twelve semitones; notes pass through unchanged.
    #[default]
    Chromatic,
    /// Ionian: W W H W W W H.
    Major,
    /// Natural minor (Aeolian).
    Minor,
    /// Major pentatonic.
    Pentatonic,
    /// Minor pentatonic plus the flattened fifth.
    Blues,
    /// Ascending melodic minor.
    MelodicMinor,
    /// Natural minor with a raised seventh.
    HarmonicMinor,
}
impl super::CycleConfig for Scale {}

impl Scale {
    /// The table this scale quantizes against, or `None` for [`Scale::Chromatic`].
    pub fn table(&self) -> Option<ScaleTable> {
        match self {
            Self::Chromatic => None,
            Self::Major => Some(ScaleTable::MAJOR),
            Self::Minor => Some(ScaleTable::MINOR),
            Self::Pentatonic => Some(ScaleTable::PENTATONIC),
            Self::Blues => Some(ScaleTable::BLUES),
            Self::MelodicMinor => Some(ScaleTable::MELODIC_MINOR),
            Self::HarmonicMinor => Some(ScaleTable::HARMONIC_MINOR),
        }
    }
}
