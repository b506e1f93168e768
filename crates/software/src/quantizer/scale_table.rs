use crate::error::ConfigurationError;

/// Number of offsets a [`ScaleTable`] holds, including the octave sentinel.
pub const SCALE_TABLE_LEN: usize = 8;

/// Semitone offset marking the top of the octave.
pub const OCTAVE: u8 = 12;

/// Ascending semitone offsets within one octave, terminated by [`OCTAVE`].
///
/// Scales with fewer than seven notes repeat the sentinel to fill the table, so a scan always stops at or before the
/// first sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScaleTable {
    offsets: [u8; SCALE_TABLE_LEN],
}

impl ScaleTable {
    /// Major (Ionian).
    pub const MAJOR: Self = Self::from_raw([0, 2, 4, 5, 7, 9, 11, 12]);
    /// Natural minor.
    pub const MINOR: Self = Self::from_raw([0, 2, 3, 5, 7, 8, 10, 12]);
    /// Major pentatonic.
    pub const PENTATONIC: Self = Self::from_raw([0, 2, 4, 7, 9, 12, 12, 12]);
    /// Minor pentatonic with the flattened fifth.
    pub const BLUES: Self = Self::from_raw([0, 3, 5, 6, 7, 10, 12, 12]);
    /// Ascending melodic minor.
    pub const MELODIC_MINOR: Self = Self::from_raw([0, 2, 3, 5, 7, 9, 11, 12]);
    /// Harmonic minor.
    pub const HARMONIC_MINOR: Self = Self::from_raw([0, 2, 3, 5, 7, 8, 11, 12]);

    const fn from_raw(offsets: [u8; SCALE_TABLE_LEN]) -> Self {
        Self { offsets }
    }

    /// Builds a table from a user-defined list of offsets.
    ///
    /// Offsets must be strictly ascending and below [`OCTAVE`], except for an optional final [`OCTAVE`]. The sentinel
    /// is appended when missing and the remainder of the table is padded with it.
    pub fn new(offsets: &[u8]) -> Result<Self, ConfigurationError> {
        let notes = match offsets.split_last() {
            Some((&OCTAVE, notes)) => notes,
            Some(_) => offsets,
            None => return Err(ConfigurationError::InvalidScale),
        };

        let ascending = notes.windows(2).all(|pair| pair[0] < pair[1]);
        let within_octave = notes.iter().all(|&offset| offset < OCTAVE);
        if notes.is_empty() || notes.len() >= SCALE_TABLE_LEN || !ascending || !within_octave {
            return Err(ConfigurationError::InvalidScale);
        }

        let mut table = [OCTAVE; SCALE_TABLE_LEN];
        table[..notes.len()].copy_from_slice(notes);
        Ok(Self { offsets: table })
    }

    /// Getter.
    pub fn offsets(&self) -> &[u8; SCALE_TABLE_LEN] {
        &self.offsets
    }

    /// The first offset at or above `semitone`; never snaps downward.
    ///
    /// May return [`OCTAVE`], meaning the note belongs to the root of the next octave.
    pub fn snap(&self, semitone: u8) -> u8 {
        self.offsets
            .iter()
            .copied()
            .find(|&offset| offset >= semitone)
            .unwrap_or(OCTAVE)
    }
}
