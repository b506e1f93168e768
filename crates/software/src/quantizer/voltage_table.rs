use crate::{error::BoundsError, error::ConfigurationError, io::Code};

/// Entries in [`DEFAULT_VOLTAGE_TABLE`]: ten octaves of semitones plus the top C.
pub const DEFAULT_TABLE_LEN: usize = 121;

/// Ten octaves spread over the lower half of a 12-bit converter behind an inverting output stage, so code 2047 is 0 V
/// and code 0 is 10 V.
pub const DEFAULT_VOLTAGE_TABLE: VoltageLookupTable<DEFAULT_TABLE_LEN> =
    match VoltageLookupTable::try_generate(2047, 2047) {
        Ok(table) => table,
        Err(_) => panic!("default voltage table parameters are invalid"),
    };

/// Output codes indexed by semitone, `octave * 12 + semitone`.
///
/// Codes are strictly monotonic; whether they rise or fall depends on the polarity of the output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoltageLookupTable<const N: usize> {
    codes: [Code; N],
}

impl<const N: usize> VoltageLookupTable<N> {
    /// Spreads `N` codes evenly from `code_max` down to `code_max - code_range`.
    ///
    /// Entry `i` is `round(code_max - code_range * i / (N - 1))`, halves rounding up, computed in integers so the table
    /// can be built at compile time. Fails for fewer than two entries, for a range larger than `code_max`, and for a
    /// range smaller than the number of steps, since neighbouring entries could then round to the same code.
    pub const fn try_generate(code_max: Code, code_range: Code) -> Result<Self, ConfigurationError> {
        if N < 2 {
            return Err(ConfigurationError::InvalidVoltageTable);
        }
        let steps = (N - 1) as u64;
        if code_range > code_max || (code_range as u64) < steps {
            return Err(ConfigurationError::InvalidVoltageTable);
        }

        let mut codes = [0; N];
        let mut i = 0;
        while i < N {
            // floor((code_max - code_range * i / steps) + 1/2), scaled by 2 * steps
            let numerator =
                2 * (code_max as u64 * steps - code_range as u64 * i as u64) + steps;
            codes[i] = (numerator / (2 * steps)) as Code;
            i += 1;
        }
        Ok(Self { codes })
    }

    /// Wraps a precomputed table, rejecting it unless it is strictly monotonic.
    pub fn from_codes(codes: [Code; N]) -> Result<Self, ConfigurationError> {
        let rising = codes.windows(2).all(|pair| pair[0] < pair[1]);
        let falling = codes.windows(2).all(|pair| pair[0] > pair[1]);
        if N == 0 || !(rising || falling) {
            return Err(ConfigurationError::InvalidVoltageTable);
        }
        Ok(Self { codes })
    }

    /// Returns the code for `index`.
    ///
    /// An index past the end is clamped to the last entry; the error reports the clamp and carries that entry's code.
    pub fn lookup(&self, index: usize) -> Result<Code, BoundsError> {
        match self.codes.get(index) {
            Some(&code) => Ok(code),
            None => {
                let max_index = N - 1;
                Err(BoundsError {
                    index,
                    max_index,
                    clamped_code: self.codes[max_index],
                })
            }
        }
    }

    /// Getter.
    pub fn codes(&self) -> &[Code; N] {
        &self.codes
    }

    /// Number of entries.
    pub const fn len(&self) -> usize {
        N
    }

    /// Always `false`; an empty table cannot be constructed.
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}
