use crate::{
    error::ConfigurationError,
    io::{Channel, Sample},
};

/// Which way a sample must travel through the [`HysteresisBand`] to count as a clock edge.
///
/// The polarity describes the reading, not the jack. Input stages that invert the incoming clock (the usual case for
/// op-amp buffered inputs) report a rising pulse as a falling sample, so they want [`EdgePolarity::Falling`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgePolarity {
    /// The previous sample sat above the high threshold and the current one sits below the low threshold.
    #[default]
    Falling,
    /// The previous sample sat below the low threshold and the current one sits above the high threshold.
    Rising,
}

/// Two thresholds between which a reading counts as neither high nor low.
///
/// Comparisons are strict: a reading equal to a threshold is inside the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HysteresisBand {
    /// Readings below this are low.
    pub low: Sample,
    /// Readings above this are high.
    pub high: Sample,
}

impl HysteresisBand {
    /// Constructs a [`HysteresisBand`], rejecting a low threshold above the high one.
    pub fn new(low: Sample, high: Sample) -> Result<Self, ConfigurationError> {
        let band = Self { low, high };
        band.validate()?;
        Ok(band)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.low > self.high {
            return Err(ConfigurationError::InvertedHysteresis {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    /// Whether moving from `previous` to `current` crosses the whole band in the direction of `polarity`.
    pub fn is_crossed(&self, polarity: EdgePolarity, previous: Sample, current: Sample) -> bool {
        match polarity {
            EdgePolarity::Falling => previous > self.high && current < self.low,
            EdgePolarity::Rising => previous < self.low && current > self.high,
        }
    }
}

impl Default for HysteresisBand {
    /// Roughly half a volt on a 12-bit input, with a narrow band above the trigger point.
    fn default() -> Self {
        Self {
            low: 2000,
            high: 2048,
        }
    }
}

/// Everything that differs between hardware revisions of the clock input.
///
/// Revisions have shipped with different sample rates, edge polarities, thresholds, and with or without a second input
/// that is read back every period; all of them are expressed as values of this one struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// How often the clock input is sampled.
    pub sample_rate_hz: u32,
    /// Direction of a qualifying edge.
    pub edge: EdgePolarity,
    /// Thresholds a qualifying edge must cross.
    pub hysteresis: HysteresisBand,
    /// Input carrying the clock.
    pub clock_channel: Channel,
    /// Input sampled alongside the clock purely so its value can be read back.
    pub auxiliary_channel: Option<Channel>,
    /// When disabled, every qualifying edge dispatches a step and the divisor is fixed at 1.
    pub divisor_support: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 1_000,
            edge: EdgePolarity::default(),
            hysteresis: HysteresisBand::default(),
            clock_channel: 0,
            auxiliary_channel: None,
            divisor_support: true,
        }
    }
}

impl ClockConfig {
    /// Checks the settings that do not depend on the timer.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.hysteresis.validate()
    }
}
