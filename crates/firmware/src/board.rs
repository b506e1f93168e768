//! Pins, converters and the sampling schedule of the Nucleo-F767ZI.

use embassy_stm32::{
    Peri,
    adc::Adc,
    dac::{DacCh1, DacCh2, Value},
    mode::Async,
    peripherals::{ADC1, DAC1, PA3, PC0},
};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    watch::{Receiver, Watch},
};
use embassy_time::{Duration, TICK_HZ};
use shift_register_cv_lib::{
    error::ConfigurationError,
    io::{Channel, Code, DeviceIo, Sample},
    timer::{SampleTimer, TimerSpec},
};

/// Clock input, on A0 of the Arduino header.
pub const CLOCK_CHANNEL: Channel = 0;
/// Front-panel knob, on A1 of the Arduino header.
pub const KNOB_CHANNEL: Channel = 1;

const SAMPLING_RECEIVER_CNT: usize = 1;
type SamplingSync = Watch<CriticalSectionRawMutex, Option<Duration>, SAMPLING_RECEIVER_CNT>;
pub type SamplingReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, Option<Duration>, SAMPLING_RECEIVER_CNT>;

/// Carries the sampling period to the sampling task; `None` halts sampling.
pub static SAMPLING_SYNC: SamplingSync = Watch::new();

/// The time driver's tick is the only clock the ticker can divide.
const TICKER_SPEC: TimerSpec = TimerSpec {
    input_hz: TICK_HZ as u32,
    prescalers: &[1],
    max_count: u32::MAX,
};

/// The converters the clock engine reads and writes.
pub struct Board {
    adc: Adc<'static, ADC1>,
    clock_in: Peri<'static, PA3>,
    knob: Peri<'static, PC0>,
    cv_out: DacCh1<'static, DAC1, Async>,
    // unused, but dropping either channel disables the whole DAC; see https://github.com/embassy-rs/embassy/issues/4577
    _spare: DacCh2<'static, DAC1, Async>,
}

impl Board {
    pub fn new(
        adc: Adc<'static, ADC1>,
        clock_in: Peri<'static, PA3>,
        knob: Peri<'static, PC0>,
        cv_out: DacCh1<'static, DAC1, Async>,
        spare: DacCh2<'static, DAC1, Async>,
    ) -> Self {
        Self {
            adc,
            clock_in,
            knob,
            cv_out,
            _spare: spare,
        }
    }
}

impl DeviceIo for Board {
    fn read(&mut self, channel: Channel) -> Sample {
        match channel {
            CLOCK_CHANNEL => self.adc.blocking_read(&mut self.clock_in),
            KNOB_CHANNEL => self.adc.blocking_read(&mut self.knob),
            _ => 0,
        }
    }

    fn write(&mut self, code: Code) {
        self.cv_out.set(Value::Bit12Right(code));
    }
}

/// Paces sampling with an [`embassy_time::Ticker`] running in the high-priority executor.
///
/// Starting and stopping only publishes the period; the sampling task owns the ticker.
#[derive(Default)]
pub struct TickerTimer {
    period: Option<Duration>,
}

impl SampleTimer for TickerTimer {
    fn configure(&mut self, rate_hz: u32) -> Result<Duration, ConfigurationError> {
        let divider = TICKER_SPEC.divider_for(rate_hz)?;
        if divider.achieved_hz() != rate_hz {
            defmt::warn!(
                "Sampling at {} Hz instead of {} Hz",
                divider.achieved_hz(),
                rate_hz
            );
        }
        let period = Duration::from_ticks(u64::from(divider.count()));
        self.period = Some(period);
        Ok(period)
    }

    fn start(&mut self) {
        SAMPLING_SYNC.sender().send(self.period);
    }

    fn stop(&mut self) {
        SAMPLING_SYNC.sender().send(None);
    }
}
