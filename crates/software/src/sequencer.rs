//! A 16-bit rotating shift register with a noisy feedback bit, in the spirit of the Turing Machine module.
//!
//! Each step rotates the register left by one. The bit leaving the top re-enters at the bottom, unless the random
//! source decides to flip it. With a flip probability of zero the register simply rotates, repeating every sixteen
//! steps (or fewer); as the probability rises towards one half the pattern dissolves into noise, and close to one it
//! settles into a pattern of double length with alternating polarity.
//!
//! Notes are read from the low byte only, scaled by a divisor chosen from [`RANGE_DIVISORS`] into one of ten octave
//! ranges.

use crate::error::ConfigurationError;
use rand::Rng;

/// Denominator of [`FlipProbability`].
pub const FLIP_DENOMINATOR: u16 = 32_768;

/// Divisors for the ten selectable octave ranges, narrowest first.
///
/// The narrowest covers ten semitones; the widest covers 105 and reaches the top of the default voltage table.
pub const RANGE_DIVISORS: [u16; 10] = [170, 85, 57, 43, 34, 28, 24, 21, 19, 17];

/// Index into [`RANGE_DIVISORS`] for the widest span.
pub const DEFAULT_RANGE_INDEX: usize = RANGE_DIVISORS.len() - 1;

/// Likelihood of the recirculating bit being inverted, as a numerator over [`FLIP_DENOMINATOR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlipProbability(u16);

impl FlipProbability {
    /// Never flip: the register loops.
    pub const NEVER: Self = Self(0);
    /// Flip half the time: every bit is a coin toss.
    pub const HALF: Self = Self(FLIP_DENOMINATOR / 2);

    /// Constructs a [`FlipProbability`] of `numerator / 32768`, which must stay below one.
    pub fn new(numerator: u16) -> Result<Self, ConfigurationError> {
        if numerator >= FLIP_DENOMINATOR {
            return Err(ConfigurationError::FlipProbabilityOutOfRange { numerator });
        }
        Ok(Self(numerator))
    }

    /// Getter.
    pub fn numerator(&self) -> u16 {
        self.0
    }
}

impl Default for FlipProbability {
    fn default() -> Self {
        Self::HALF
    }
}

/// The shift register and the settings shaping its output.
#[derive(Debug, Clone)]
pub struct ShiftRegister<R> {
    register: u16,
    flip_probability: FlipProbability,
    divisors: &'static [u16],
    range_index: usize,
    forced: Option<bool>,
    rng: R,
}

impl<R: Rng> ShiftRegister<R> {
    /// Constructs a [`ShiftRegister`] holding `seed`, set to the widest range and [`FlipProbability::HALF`].
    pub fn new(rng: R, seed: u16) -> Self {
        Self {
            register: seed,
            flip_probability: FlipProbability::default(),
            divisors: &RANGE_DIVISORS,
            range_index: DEFAULT_RANGE_INDEX,
            forced: None,
            rng,
        }
    }

    /// Replaces the table of range divisors, selecting its last entry.
    ///
    /// Fails if the table is empty or contains a zero.
    pub fn with_divisors(mut self, divisors: &'static [u16]) -> Result<Self, ConfigurationError> {
        if let Some(index) = divisors.iter().position(|&divisor| divisor == 0) {
            return Err(ConfigurationError::ZeroRangeDivisor { index });
        }
        let Some(last) = divisors.len().checked_sub(1) else {
            return Err(ConfigurationError::RangeOutOfBounds { index: 0, len: 0 });
        };
        self.divisors = divisors;
        self.range_index = last;
        Ok(self)
    }

    /// Advances the register by one position.
    ///
    /// A bit set by [`force_bit`][Self::force_bit] enters the bottom in place of the feedback, and is never flipped.
    pub fn step(&mut self) {
        let feedback = match self.forced.take() {
            Some(bit) => u16::from(bit),
            None => {
                let recirculated = self.register >> 15;
                if self.rng.gen_range(0..FLIP_DENOMINATOR) < self.flip_probability.0 {
                    recirculated ^ 1
                } else {
                    recirculated
                }
            }
        };
        self.register = (self.register << 1) | feedback;
    }

    /// Overrides the bit the next [`step`][Self::step] writes into the least-significant position, e.g., from a manual
    /// step input.
    ///
    /// A second call before the step replaces the first.
    pub fn force_bit(&mut self, value: bool) {
        self.forced = Some(value);
    }

    /// Getter.
    pub fn register(&self) -> u16 {
        self.register
    }

    /// Sets the flip probability for subsequent steps.
    pub fn set_flip_probability(&mut self, probability: FlipProbability) {
        debug!("Flip probability set to {}/32768", probability.0);
        self.flip_probability = probability;
    }

    /// Getter.
    pub fn flip_probability(&self) -> FlipProbability {
        self.flip_probability
    }

    /// Selects the span of derived notes; index 0 is the narrowest.
    pub fn set_range(&mut self, index: usize) -> Result<(), ConfigurationError> {
        match self.divisors.get(index) {
            Some(0) => Err(ConfigurationError::ZeroRangeDivisor { index }),
            Some(_) => {
                debug!("Range set to index {}", index);
                self.range_index = index;
                Ok(())
            }
            None => Err(ConfigurationError::RangeOutOfBounds {
                index,
                len: self.divisors.len(),
            }),
        }
    }

    /// Getter.
    pub fn range_index(&self) -> usize {
        self.range_index
    }

    /// Getter.
    pub fn range_divisor(&self) -> u16 {
        self.divisors[self.range_index]
    }

    /// Reads the current note from the low byte of the register.
    pub fn derive_note(&self) -> u16 {
        derive_note(self.register, self.range_divisor())
    }
}

/// Scales the low byte of `register` into a note number.
///
/// The byte is offset and widened into 16-bit fixed point with five fractional bits, divided by `divisor`, and rounded
/// back to an integer. All arithmetic is 16-bit: bits shifted out past the top are lost, so low bytes from 224 up wrap
/// around to the bottom of the range. `divisor` must not be zero.
pub fn derive_note(register: u16, divisor: u16) -> u16 {
    let active_bits = ((register & 0xFF) << 3) + 0x100;
    let fixed_point = (active_bits << 5) / divisor + 0x10;
    fixed_point >> 5
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    extern crate std;
    use std::vec::Vec;

    fn looping(seed: u16) -> ShiftRegister<SmallRng> {
        let mut register = ShiftRegister::new(SmallRng::seed_from_u64(7), seed);
        register.set_flip_probability(FlipProbability::NEVER);
        register
    }

    fn notes(register: &mut ShiftRegister<SmallRng>, steps: usize) -> Vec<u16> {
        (0..steps)
            .map(|_| {
                register.step();
                register.derive_note()
            })
            .collect()
    }

    #[test]
    fn derive_note_is_bit_exact() {
        assert_eq!(15, derive_note(0, 17), "Expected left but got right");
        assert_eq!(93, derive_note(0xA5, 17), "Expected left but got right");
        assert_eq!(120, derive_note(223, 17), "Expected left but got right");
        assert_eq!(4, derive_note(0, 57), "Expected left but got right");
        assert_eq!(5, derive_note(2, 57), "Expected left but got right");
        assert_eq!(12, derive_note(223, 170), "Expected left but got right");
        assert_eq!(
            derive_note(0x12A5, 17),
            derive_note(0x00A5, 17),
            "Only the low byte should matter"
        );
    }

    #[test]
    fn derive_note_wraps_above_223() {
        assert_eq!(0, derive_note(224, 17), "Expected left but got right");
        assert_eq!(15, derive_note(255, 17), "Expected left but got right");
    }

    #[test]
    fn ranges_widen_with_index() {
        let spans: Vec<u16> = RANGE_DIVISORS
            .iter()
            .map(|&divisor| derive_note(223, divisor) - derive_note(0, divisor))
            .collect();
        assert_eq!(
            std::vec![10, 21, 32, 41, 52, 64, 74, 85, 94, 105],
            spans,
            "Expected left but got right"
        );
        assert_eq!(
            120,
            derive_note(223, RANGE_DIVISORS[DEFAULT_RANGE_INDEX]),
            "Widest range should top out at the last table entry"
        );
    }

    #[test]
    fn zero_probability_rotates() {
        let mut register = looping(0x8001);
        register.step();
        assert_eq!(0x0003, register.register(), "Expected left but got right");
        for _ in 0..16 {
            register.step();
        }
        assert_eq!(0x0003, register.register(), "Sixteen steps should come full circle");
    }

    #[test]
    fn golden_sequence() {
        let mut register = looping(0xACE1);
        let expected = [
            107, 78, 21, 27, 40, 65, 116, 96, 57, 99, 64, 112, 88, 41, 68, 0,
        ];
        assert_eq!(&expected[..], &notes(&mut register, 16)[..], "Expected left but got right");
        assert_eq!(&expected[..4], &notes(&mut register, 4)[..], "Sequence should repeat");
    }

    #[test]
    fn replay_is_identical() {
        let mut first = looping(0x1234);
        first.set_range(3).unwrap();
        let mut second = looping(0x1234);
        second.set_range(3).unwrap();
        assert_eq!(notes(&mut first, 100), notes(&mut second, 100), "Expected left but got right");
    }

    #[test]
    fn seeded_noise_is_repeatable() {
        let mut first = ShiftRegister::new(SmallRng::seed_from_u64(99), 0);
        let mut second = ShiftRegister::new(SmallRng::seed_from_u64(99), 0);
        assert_eq!(notes(&mut first, 64), notes(&mut second, 64), "Expected left but got right");
    }

    #[test]
    fn near_certain_flips_invert_the_feedback() {
        let mut register = ShiftRegister::new(SmallRng::seed_from_u64(3), 0);
        register.set_flip_probability(FlipProbability::new(FLIP_DENOMINATOR - 1).unwrap());
        let ones = (0..64)
            .filter(|_| {
                register.step();
                register.register() & 1 == 1
            })
            .count();
        // the feedback alternates every sixteen steps; a rare miss shifts the phase but cannot pin it
        assert!((24..=40).contains(&ones), "Expected roughly half ones but got {ones}");
    }

    #[test]
    fn forced_bit_travels_through_low_byte() {
        let mut register = looping(0);
        register.force_bit(true);
        assert_eq!(0, register.register(), "Forcing should wait for the next step");

        for step in 0..8 {
            register.step();
            assert_eq!(1 << step, register.register(), "Bit should be at position {step}");
        }
        assert_ne!(0, register.register() & 0xFF, "Bit should still be in the low byte after eight steps");

        for _ in 0..9 {
            register.step();
        }
        assert_eq!(0x0001, register.register(), "Bit should come back around");
    }

    #[test]
    fn force_bit_clears_too() {
        let mut register = looping(0xFFFF);
        register.force_bit(false);
        register.step();
        assert_eq!(0xFFFE, register.register(), "Expected left but got right");
        register.step();
        assert_eq!(0xFFFD, register.register(), "Only one step should be overridden");
    }

    #[test]
    fn forced_bit_is_never_flipped() {
        let mut register = ShiftRegister::new(SmallRng::seed_from_u64(3), 0);
        register.set_flip_probability(FlipProbability::new(FLIP_DENOMINATOR - 1).unwrap());
        register.force_bit(true);
        register.force_bit(false);
        register.step();
        assert_eq!(0, register.register(), "The last forced bit should win over the flip");
    }

    #[test]
    fn range_selection_is_validated() {
        let mut register = looping(0);
        assert_eq!(DEFAULT_RANGE_INDEX, register.range_index());
        assert_eq!(17, register.range_divisor());

        register.set_range(2).unwrap();
        assert_eq!(57, register.range_divisor(), "Expected left but got right");

        assert_eq!(
            Err(ConfigurationError::RangeOutOfBounds { index: 10, len: 10 }),
            register.set_range(10),
            "Expected left but got right"
        );
        assert_eq!(57, register.range_divisor(), "Rejected index should not change range");
    }

    #[test]
    fn custom_divisors_are_validated() {
        static WITH_ZERO: [u16; 2] = [12, 0];
        static EMPTY: [u16; 0] = [];
        static NARROW: [u16; 2] = [200, 100];

        assert_eq!(
            Err(ConfigurationError::ZeroRangeDivisor { index: 1 }),
            looping(0).with_divisors(&WITH_ZERO).map(|r| r.range_index())
        );
        assert_eq!(
            Err(ConfigurationError::RangeOutOfBounds { index: 0, len: 0 }),
            looping(0).with_divisors(&EMPTY).map(|r| r.range_index())
        );
        let register = looping(0).with_divisors(&NARROW).unwrap();
        assert_eq!(100, register.range_divisor(), "Expected left but got right");
    }

    #[test]
    fn flip_probability_must_stay_below_one() {
        assert_eq!(
            Err(ConfigurationError::FlipProbabilityOutOfRange { numerator: 32_768 }),
            FlipProbability::new(32_768)
        );
        assert_eq!(Ok(32_767), FlipProbability::new(32_767).map(|p| p.numerator()));
    }
}
