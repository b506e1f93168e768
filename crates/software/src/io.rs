//! The contract between the signal path and the converters on the board.
//!
//! The core only ever needs two things from the hardware: one analog reading from a numbered input, and one code
//! written to the output converter. Channel numbers are opaque; the board assigns their meaning.

/// A raw analog reading, e.g., a 12-bit unsigned ADC conversion.
pub type Sample = u16;

/// A code written to the output converter, at the same resolution as [`Sample`].
pub type Code = u16;

/// Identifies an analog input.
pub type Channel = u8;

/// Full-scale value of a 12-bit converter.
pub const CONVERTER_MAX: u16 = 4095;

/// Raw access to the analog inputs and the CV output.
pub trait DeviceIo {
    /// Performs one conversion on the given input.
    fn read(&mut self, channel: Channel) -> Sample;

    /// Sets the output converter to `code`.
    fn write(&mut self, code: Code);
}

impl<T: DeviceIo + ?Sized> DeviceIo for &mut T {
    fn read(&mut self, channel: Channel) -> Sample {
        (**self).read(channel)
    }

    fn write(&mut self, code: Code) {
        (**self).write(code)
    }
}
