//! Snaps notes to a musical scale and turns them into output codes.
//!
//! A note number is split into an octave and a semitone. With a scale selected, the semitone moves up to the nearest
//! scale degree at or above it; a semitone that rises past the last degree becomes the root of the next octave. The
//! resulting pitch indexes a [`VoltageLookupTable`] which holds the code the output converter needs for that pitch.

mod scale_table;
pub use scale_table::*;

mod voltage_table;
pub use voltage_table::*;

use crate::{error::BoundsError, io::Code};
use measurements::Voltage;
use wmidi::Note;

/// Semitones per octave.
pub const SEMITONES_PER_OCTAVE: u16 = 12;

/// The note the bottom of the default voltage table sounds as, for logging.
pub const TABLE_BASE_NOTE: Note = Note::C0;

/// A quantized pitch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pitch {
    /// Octave above the bottom of the voltage table.
    pub octave: u16,
    /// Semitone within the octave, `0..12`.
    pub semitone: u8,
}

impl Pitch {
    /// Position of this pitch in a [`VoltageLookupTable`].
    pub fn index(&self) -> usize {
        usize::from(self.octave) * usize::from(SEMITONES_PER_OCTAVE) + usize::from(self.semitone)
    }

    /// Voltage above the bottom of the table, at one volt per octave.
    pub fn voltage(&self) -> Voltage {
        Voltage::from_volts(self.index() as f64 / f64::from(SEMITONES_PER_OCTAVE))
    }

    /// The MIDI note this pitch sounds as when the bottom of the table is tuned to `base`.
    ///
    /// Saturates at the top of the MIDI range.
    pub fn note(&self, base: Note) -> Note {
        let number = (u8::from(base) as usize + self.index()).min(u8::from(Note::HIGHEST_NOTE) as usize);
        Note::from_u8_lossy(number as u8)
    }
}

/// Quantizes notes against an optional [`ScaleTable`] and looks up their output codes.
#[derive(Debug, Clone)]
pub struct Quantizer<const N: usize = DEFAULT_TABLE_LEN> {
    /// `None` is the chromatic scale: no quantization.
    scale: Option<ScaleTable>,
    table: VoltageLookupTable<N>,
    pitch: Pitch,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new(DEFAULT_VOLTAGE_TABLE)
    }
}

impl<const N: usize> Quantizer<N> {
    /// Constructs a chromatic [`Quantizer`] over the given table.
    pub fn new(table: VoltageLookupTable<N>) -> Self {
        Self {
            scale: None,
            table,
            pitch: Pitch::default(),
        }
    }

    /// Selects the active scale; `None` disables quantization.
    ///
    /// Takes effect at the next [`set_note`][Self::set_note].
    pub fn set_scale(&mut self, scale: Option<ScaleTable>) {
        self.scale = scale;
    }

    /// Getter.
    pub fn scale(&self) -> Option<&ScaleTable> {
        self.scale.as_ref()
    }

    /// Quantizes `note` and stores the resulting [`Pitch`].
    pub fn set_note(&mut self, note: u16) {
        let mut octave = note / SEMITONES_PER_OCTAVE;
        let mut semitone = (note % SEMITONES_PER_OCTAVE) as u8;

        if let Some(scale) = &self.scale {
            semitone = scale.snap(semitone);
            // the top of one octave is the root of the next
            if semitone == OCTAVE {
                octave += 1;
                semitone = 0;
            }
        }

        self.pitch = Pitch { octave, semitone };
    }

    /// Getter.
    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    /// The resolved semitone, for display.
    pub fn semitone(&self) -> u8 {
        self.pitch.semitone
    }

    /// The code for the current pitch.
    ///
    /// Pitches above the table clamp to its last entry; see [`VoltageLookupTable::lookup`].
    pub fn output_code(&self) -> Result<Code, BoundsError> {
        self.table.lookup(self.pitch.index())
    }

    /// Getter.
    pub fn table(&self) -> &VoltageLookupTable<N> {
        &self.table
    }
}
