//! A narrow abstraction over the periodic timer that paces clock sampling.
//!
//! The clock engine never touches timer registers. It asks a [`SampleTimer`] to run at a rate, to start and to stop;
//! whatever drives [`ClockEngine::sample`](crate::clock::ClockEngine::sample) once per period is the timer's business.
//! On the board that is a high-priority task woken by a ticker, on the host it is [`SimulatedTimer`].

use crate::error::ConfigurationError;
use core::cell::Cell;
use embassy_time::Duration;

/// Describes a counter peripheral: its input clock, the prescalers it offers, and the largest compare value it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    /// Frequency of the clock feeding the prescaler.
    pub input_hz: u32,
    /// Available prescalers, in ascending order.
    pub prescalers: &'static [u32],
    /// Largest compare value the counter can hold.
    pub max_count: u32,
}

/// A prescaler and compare value pair which produces a periodic interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerDivider {
    input_hz: u32,
    prescaler: u32,
    count: u32,
}

impl TimerSpec {
    /// An 8-bit microcontroller's 16-bit timer running from a 20 MHz crystal.
    pub const AVR_TIMER1: Self = Self {
        input_hz: 20_000_000,
        prescalers: &[1, 8, 64, 256, 1024],
        max_count: u16::MAX as u32,
    };

    /// Finds the smallest prescaler able to produce `rate_hz`.
    ///
    /// The compare value is rounded down, so the achieved rate is never below the requested one. Zero prescalers are
    /// skipped, and a spec without an input clock cannot produce any rate.
    pub fn divider_for(&self, rate_hz: u32) -> Result<TimerDivider, ConfigurationError> {
        if rate_hz == 0 || self.input_hz == 0 {
            return Err(ConfigurationError::UnrepresentableSampleRate { hz: rate_hz });
        }

        self.prescalers
            .iter()
            .find_map(|&prescaler| {
                let count = self.input_hz.checked_div(prescaler.checked_mul(rate_hz)?)?;
                (1..=self.max_count).contains(&count).then_some(TimerDivider {
                    input_hz: self.input_hz,
                    prescaler,
                    count,
                })
            })
            .ok_or(ConfigurationError::UnrepresentableSampleRate { hz: rate_hz })
    }
}

impl TimerDivider {
    /// Getter.
    pub fn prescaler(&self) -> u32 {
        self.prescaler
    }

    /// Getter.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The interrupt rate this divider actually produces.
    pub fn achieved_hz(&self) -> u32 {
        (u64::from(self.input_hz) / (u64::from(self.prescaler) * u64::from(self.count))) as u32
    }

    /// Time between two interrupts.
    pub fn period(&self) -> Duration {
        let ticks = u64::from(self.prescaler) * u64::from(self.count);
        Duration::from_micros(ticks * 1_000_000 / u64::from(self.input_hz))
    }
}

/// A periodic timer which calls into the clock engine once per period.
pub trait SampleTimer {
    /// Prepares the timer for `rate_hz`, returning the resulting period.
    ///
    /// Fails when the hardware cannot produce the rate. Must be called before [`start`][Self::start].
    fn configure(&mut self, rate_hz: u32) -> Result<Duration, ConfigurationError>;

    /// Begins periodic sampling.
    fn start(&mut self);

    /// Halts periodic sampling. Nothing the engine holds is reset.
    fn stop(&mut self);
}

/// A host-side timer which fires its callback on demand, for tests and simulation.
///
/// State lives in cells so a shared reference can be handed to the engine as its [`SampleTimer`] while the caller keeps
/// another to drive [`advance`][Self::advance].
#[derive(Debug)]
pub struct SimulatedTimer {
    spec: TimerSpec,
    divider: Cell<Option<TimerDivider>>,
    running: Cell<bool>,
}

impl Default for SimulatedTimer {
    fn default() -> Self {
        Self::new(TimerSpec::AVR_TIMER1)
    }
}

impl SimulatedTimer {
    /// Constructs a [`SimulatedTimer`] modelling the given hardware.
    pub fn new(spec: TimerSpec) -> Self {
        Self {
            spec,
            divider: Cell::new(None),
            running: Cell::new(false),
        }
    }

    /// The divider chosen by the last successful [`configure`][SampleTimer::configure].
    pub fn divider(&self) -> Option<TimerDivider> {
        self.divider.get()
    }

    /// Getter.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Lets `periods` timer periods elapse, calling `callback` once for each while the timer runs.
    ///
    /// The callback may stop the timer, ending the run early. Returns how many times the callback fired.
    pub fn advance(&self, periods: usize, mut callback: impl FnMut()) -> usize {
        let mut fired = 0;
        while fired < periods && self.running.get() {
            callback();
            fired += 1;
        }
        fired
    }
}

impl SampleTimer for &SimulatedTimer {
    fn configure(&mut self, rate_hz: u32) -> Result<Duration, ConfigurationError> {
        let divider = self.spec.divider_for(rate_hz)?;
        self.divider.set(Some(divider));
        Ok(divider.period())
    }

    fn start(&mut self) {
        // an unconfigured timer has no period to run at
        self.running.set(self.divider.get().is_some());
    }

    fn stop(&mut self) {
        self.running.set(false);
    }
}

impl SampleTimer for SimulatedTimer {
    fn configure(&mut self, rate_hz: u32) -> Result<Duration, ConfigurationError> {
        <&Self as SampleTimer>::configure(&mut &*self, rate_hz)
    }

    fn start(&mut self) {
        <&Self as SampleTimer>::start(&mut &*self)
    }

    fn stop(&mut self) {
        <&Self as SampleTimer>::stop(&mut &*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_kilohertz_needs_no_prescaler() {
        let divider = TimerSpec::AVR_TIMER1.divider_for(1_000).unwrap();
        assert_eq!(1, divider.prescaler(), "Expected left but got right");
        assert_eq!(20_000, divider.count(), "Expected left but got right");
        assert_eq!(1_000, divider.achieved_hz(), "Expected left but got right");
        assert_eq!(
            Duration::from_micros(1_000),
            divider.period(),
            "Expected left but got right"
        );
    }

    #[test]
    fn slow_rates_climb_the_prescalers() {
        let divider = TimerSpec::AVR_TIMER1.divider_for(100).unwrap();
        assert_eq!(8, divider.prescaler(), "Expected left but got right");
        assert_eq!(25_000, divider.count(), "Expected left but got right");

        let divider = TimerSpec::AVR_TIMER1.divider_for(1).unwrap();
        assert_eq!(1024, divider.prescaler(), "Expected left but got right");
        assert_eq!(19_531, divider.count(), "Expected left but got right");
    }

    #[test]
    fn unrepresentable_rates() {
        assert_eq!(
            Err(ConfigurationError::UnrepresentableSampleRate { hz: 0 }),
            TimerSpec::AVR_TIMER1.divider_for(0),
            "Expected left but got right"
        );
        assert_eq!(
            Err(ConfigurationError::UnrepresentableSampleRate { hz: 40_000_000 }),
            TimerSpec::AVR_TIMER1.divider_for(40_000_000),
            "Expected left but got right"
        );

        let coarse = TimerSpec {
            input_hz: 1_000_000,
            prescalers: &[1],
            max_count: 255,
        };
        assert!(coarse.divider_for(1_000).is_err(), "Count of 1000 should not fit in 8 bits");
        assert!(coarse.divider_for(4_000).is_ok(), "Count of 250 should fit in 8 bits");
    }

    #[test]
    fn degenerate_specs_are_rejected() {
        let zero_prescaler = TimerSpec {
            input_hz: 1_000_000,
            prescalers: &[0],
            max_count: 255,
        };
        assert_eq!(
            Err(ConfigurationError::UnrepresentableSampleRate { hz: 4_000 }),
            zero_prescaler.divider_for(4_000),
            "Expected left but got right"
        );

        let skips_zero = TimerSpec {
            prescalers: &[0, 4],
            ..zero_prescaler
        };
        assert_eq!(4, skips_zero.divider_for(1_000).unwrap().prescaler(), "Expected left but got right");

        let no_input = TimerSpec {
            input_hz: 0,
            ..TimerSpec::AVR_TIMER1
        };
        assert_eq!(
            Err(ConfigurationError::UnrepresentableSampleRate { hz: 1_000 }),
            no_input.divider_for(1_000),
            "Expected left but got right"
        );
    }

    #[test]
    fn callbacks_fire_only_while_running() {
        let mut timer = SimulatedTimer::default();
        let mut fired = 0;

        timer.start();
        assert!(!timer.is_running(), "An unconfigured timer should not start");
        assert_eq!(0, timer.advance(3, || fired += 1), "Expected left but got right");

        timer.configure(2_000).unwrap();
        timer.start();
        assert_eq!(3, timer.advance(3, || fired += 1), "Expected left but got right");

        timer.stop();
        assert_eq!(0, timer.advance(3, || fired += 1), "Expected left but got right");
        assert_eq!(3, fired, "Expected left but got right");
    }

    #[test]
    fn callback_can_stop_the_timer() {
        let timer = SimulatedTimer::default();
        let mut handle = &timer;
        handle.configure(1_000).unwrap();
        handle.start();

        let fired = timer.advance(10, || {
            let mut handle = &timer;
            handle.stop();
        });
        assert_eq!(1, fired, "Expected left but got right");
    }
}
