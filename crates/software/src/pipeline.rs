//! The main-loop half of the module: from shift register to the code buffered for the next clock step.

use crate::{
    clock::SharedClock,
    error::ConfigurationError,
    io::{Code, DeviceIo},
    quantizer::{DEFAULT_TABLE_LEN, Pitch, Quantizer, TABLE_BASE_NOTE},
    sequencer::ShiftRegister,
    timer::SampleTimer,
    ui::Setting,
};
use rand::Rng;

/// The outcome of advancing the sequence by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    /// The note read from the register, before quantization.
    pub note: u16,
    /// The quantized pitch.
    pub pitch: Pitch,
    /// The code to write on the next clock step.
    pub code: Code,
    /// Whether the pitch fell outside the voltage table and `code` was clamped.
    pub clamped: bool,
}

/// Chains the [`ShiftRegister`] into the [`Quantizer`].
#[derive(Debug, Clone)]
pub struct NotePipeline<R, const N: usize = DEFAULT_TABLE_LEN> {
    register: ShiftRegister<R>,
    quantizer: Quantizer<N>,
}

impl<R: Rng, const N: usize> NotePipeline<R, N> {
    /// Constructs a [`NotePipeline`].
    pub fn new(register: ShiftRegister<R>, quantizer: Quantizer<N>) -> Self {
        Self {
            register,
            quantizer,
        }
    }

    /// Steps the register and quantizes the note it yields.
    pub fn advance(&mut self) -> Step {
        self.register.step();
        let note = self.register.derive_note();
        self.quantizer.set_note(note);
        let pitch = self.quantizer.pitch();
        trace!(
            "Note {} quantized to {} ({} V)",
            note,
            pitch.note(TABLE_BASE_NOTE).to_str(),
            pitch.voltage().as_volts()
        );

        let (code, clamped) = match self.quantizer.output_code() {
            Ok(code) => (code, false),
            Err(error) => {
                warn!(
                    "Note {} landed at index {} past the table; clamped to {}",
                    note, error.index, error.clamped_code
                );
                (error.clamped_code, true)
            }
        };

        Step {
            note,
            pitch,
            code,
            clamped,
        }
    }

    /// Computes the first step and buffers its code, so the first clock edge has something to write.
    pub fn prime<D: DeviceIo, T: SampleTimer>(&mut self, clock: &SharedClock<D, T>) -> Step {
        let step = self.advance();
        clock.set_next_output(step.code);
        step
    }

    /// Consumes a pending tick, if there is one, by computing the following step and buffering its code.
    pub fn on_tick<D: DeviceIo, T: SampleTimer>(&mut self, clock: &SharedClock<D, T>) -> Option<Step> {
        if !clock.take_tick() {
            return None;
        }
        Some(self.prime(clock))
    }

    /// Routes a UI setting to the part it concerns.
    ///
    /// Divisors belong to the clock, so they are handed back for the caller to pass on.
    pub fn apply(&mut self, setting: Setting) -> Result<Option<u16>, ConfigurationError> {
        match setting {
            Setting::Divisor(divisor) => return Ok(Some(divisor)),
            Setting::FlipProbability(probability) => self.register.set_flip_probability(probability),
            Setting::Range(index) => self.register.set_range(index)?,
            Setting::Scale(scale) => {
                debug!("Scale set to {}", scale);
                self.quantizer.set_scale(scale.table());
            }
        }
        Ok(None)
    }

    /// Getter.
    pub fn register(&self) -> &ShiftRegister<R> {
        &self.register
    }

    /// Mutable access to the register, e.g., to force a bit in.
    pub fn register_mut(&mut self) -> &mut ShiftRegister<R> {
        &mut self.register
    }

    /// Getter.
    pub fn quantizer(&self) -> &Quantizer<N> {
        &self.quantizer
    }
}
