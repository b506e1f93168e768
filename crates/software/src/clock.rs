//! Turns a noisy analog clock into divided step triggers and dispatches double-buffered output.
//!
//! [`ClockEngine::sample`] runs once per timer period, in interrupt context on the board. It compares each reading
//! with the previous one; a pair that crosses the whole [`HysteresisBand`](crate::configuration::HysteresisBand) in the
//! configured direction counts as an edge. Every `divisor` edges, the engine writes the code buffered by
//! [`ClockEngine::set_next_output`] and raises a one-shot tick flag.
//!
//! The consumer reacts to the flag by computing the following code and buffering it, so the value written on a
//! trigger is always the one computed after the previous trigger, never something computed inside the interrupt.
//!
//! Sampling work that overruns its period is not detected. It delays the next sample, which shows up as jitter on the
//! detected edges and nothing else.

mod shared;
pub use shared::*;

use crate::{
    configuration::ClockConfig,
    error::ConfigurationError,
    io::{Code, DeviceIo, Sample},
    timer::SampleTimer,
};
use embassy_time::Duration;

/// The clock/timing engine, owning the converters and the timer that paces it.
#[derive(Debug)]
pub struct ClockEngine<D, T> {
    config: ClockConfig,
    device: D,
    timer: T,
    period: Duration,
    running: bool,
    last_sample: Sample,
    edge_counter: u16,
    divisor: u16,
    buffered_output: Code,
    tick_flag: bool,
    auxiliary: Option<Sample>,
}

impl<D: DeviceIo, T: SampleTimer> ClockEngine<D, T> {
    /// Constructs a [`ClockEngine`] and [`configure`][Self::configure]s it.
    ///
    /// The engine starts out stopped, with a divisor of 1 and nothing buffered but code 0.
    pub fn new(config: ClockConfig, device: D, timer: T) -> Result<Self, ConfigurationError> {
        let mut engine = Self {
            config,
            device,
            timer,
            period: Duration::from_ticks(0),
            running: false,
            last_sample: config.hysteresis.low,
            edge_counter: 0,
            divisor: 1,
            buffered_output: 0,
            tick_flag: false,
            auxiliary: None,
        };
        engine.configure(config)?;
        Ok(engine)
    }

    /// Validates `config` and sets the timer up for its sample rate.
    ///
    /// On failure the previous configuration stays in effect. On success any partial edge count is discarded and the
    /// previous reading is taken to sit inside the new hysteresis band, so the next reading cannot complete an edge. A
    /// running engine keeps running at the new rate; the divisor falls back to 1 if divisors are no longer supported.
    pub fn configure(&mut self, config: ClockConfig) -> Result<(), ConfigurationError> {
        config.validate()?;
        self.period = self.timer.configure(config.sample_rate_hz)?;
        info!(
            "Clock sampling channel {} at {} Hz",
            config.clock_channel, config.sample_rate_hz
        );

        self.config = config;
        self.last_sample = config.hysteresis.low;
        self.edge_counter = 0;
        if !config.divisor_support {
            self.divisor = 1;
        }
        if self.running {
            self.timer.start();
        }
        Ok(())
    }

    /// Begins periodic sampling.
    pub fn start(&mut self) {
        self.timer.start();
        self.running = true;
    }

    /// Halts periodic sampling. The divisor, buffered output and a pending tick all survive.
    pub fn stop(&mut self) {
        self.timer.stop();
        self.running = false;
    }

    /// Getter.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Sets how many edges make one step. Any partial count is discarded.
    pub fn set_divisor(&mut self, divisor: u16) -> Result<(), ConfigurationError> {
        if divisor == 0 {
            return Err(ConfigurationError::ZeroDivisor);
        }
        if divisor != 1 && !self.config.divisor_support {
            return Err(ConfigurationError::DivisorUnsupported);
        }
        debug!("Clock divisor set to {}", divisor);
        self.divisor = divisor;
        self.edge_counter = 0;
        Ok(())
    }

    /// Getter.
    pub fn divisor(&self) -> u16 {
        self.divisor
    }

    /// Buffers the code to write on the next step.
    pub fn set_next_output(&mut self, code: Code) {
        self.buffered_output = code;
    }

    /// Getter.
    pub fn next_output(&self) -> Code {
        self.buffered_output
    }

    /// Takes one reading and dispatches a step if it completes the divisor's count of edges.
    ///
    /// Called once per timer period.
    pub fn sample(&mut self) {
        let sample = self.device.read(self.config.clock_channel);
        if let Some(channel) = self.config.auxiliary_channel {
            self.auxiliary = Some(self.device.read(channel));
        }

        if self
            .config
            .hysteresis
            .is_crossed(self.config.edge, self.last_sample, sample)
        {
            self.edge_counter += 1;
            if self.edge_counter >= self.divisor {
                self.edge_counter = 0;
                self.device.write(self.buffered_output);
                self.tick_flag = true;
                trace!("Step dispatched with code {}", self.buffered_output);
            }
        }

        self.last_sample = sample;
    }

    /// Whether a step has been dispatched since the last [`acknowledge`][Self::acknowledge]. Has no side effects.
    pub fn has_ticked(&self) -> bool {
        self.tick_flag
    }

    /// Clears the tick flag.
    pub fn acknowledge(&mut self) {
        self.tick_flag = false;
    }

    /// Clears the tick flag, returning whether it was set.
    pub fn take_tick(&mut self) -> bool {
        core::mem::take(&mut self.tick_flag)
    }

    /// The most recent reading of the auxiliary channel, if one is configured and has been sampled.
    pub fn auxiliary(&self) -> Option<Sample> {
        self.auxiliary
    }

    /// Edges counted towards the next step.
    pub fn edge_count(&self) -> u16 {
        self.edge_counter
    }

    /// Time between two samples.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Getter.
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Getter.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Getter.
    pub fn timer(&self) -> &T {
        &self.timer
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        configuration::{EdgePolarity, HysteresisBand},
        io::Channel,
        timer::SimulatedTimer,
    };

    extern crate std;
    use std::{collections::VecDeque, vec::Vec};

    pub(crate) const HIGH: Sample = 3000;
    pub(crate) const LOW: Sample = 100;

    /// Replays queued readings per channel and records every write.
    #[derive(Debug, Default)]
    pub(crate) struct MockDevice {
        pub(crate) clock: VecDeque<Sample>,
        pub(crate) auxiliary: Sample,
        pub(crate) writes: Vec<Code>,
    }

    impl DeviceIo for MockDevice {
        fn read(&mut self, channel: Channel) -> Sample {
            match channel {
                0 => self.clock.pop_front().unwrap_or(HIGH),
                _ => self.auxiliary,
            }
        }

        fn write(&mut self, code: Code) {
            self.writes.push(code);
        }
    }

    /// Readings making up `edges` falling edges, starting from a high reading.
    pub(crate) fn pulses(edges: usize) -> VecDeque<Sample> {
        (0..edges).flat_map(|_| [HIGH, LOW]).collect()
    }

    pub(crate) fn engine(config: ClockConfig) -> ClockEngine<MockDevice, SimulatedTimer> {
        ClockEngine::new(config, MockDevice::default(), SimulatedTimer::default()).unwrap()
    }

    fn run(engine: &mut ClockEngine<MockDevice, SimulatedTimer>, readings: VecDeque<Sample>) {
        let count = readings.len();
        engine.device.clock = readings;
        (0..count).for_each(|_| engine.sample());
    }

    #[test]
    fn divisor_counts_edges() {
        for divisor in 1..=8 {
            let mut clock = engine(ClockConfig::default());
            clock.set_divisor(divisor).unwrap();
            clock.set_next_output(42);

            run(&mut clock, pulses(usize::from(divisor) - 1));
            assert!(!clock.has_ticked(), "{} edges should not tick", divisor - 1);
            assert!(clock.device().writes.is_empty(), "Nothing should be written yet");

            run(&mut clock, pulses(1));
            assert!(clock.has_ticked(), "{divisor} edges should tick");
            assert_eq!(&[42][..], &clock.device().writes[..], "Expected left but got right");
            assert_eq!(0, clock.edge_count(), "Counter should reset after a step");
        }
    }

    #[test]
    fn flag_is_one_shot() {
        let mut clock = engine(ClockConfig::default());
        run(&mut clock, pulses(1));
        assert!(clock.has_ticked());
        assert!(clock.has_ticked(), "Checking should not clear the flag");

        run(&mut clock, [HIGH, HIGH, HIGH].into());
        assert!(clock.has_ticked(), "Producer should never clear the flag");

        clock.acknowledge();
        assert!(!clock.has_ticked());

        run(&mut clock, pulses(1));
        assert!(clock.take_tick(), "Expected a pending tick");
        assert!(!clock.take_tick(), "Taking should clear the flag");
    }

    #[test]
    fn hysteresis_rejects_slow_and_small_transitions() {
        let mut clock = engine(ClockConfig::default());
        // hovering inside the band, then stepping down from inside it
        run(&mut clock, [HIGH, 2048, LOW, 2020, 1990, 2049, 2030, LOW].into());
        assert!(!clock.has_ticked(), "No pair of samples crossed the whole band");

        run(&mut clock, [2049, 1999].into());
        assert!(clock.has_ticked(), "Expected a crossing from 2049 to 1999");
    }

    #[test]
    fn rising_polarity() {
        let config = ClockConfig {
            edge: EdgePolarity::Rising,
            hysteresis: HysteresisBand::new(2000, 2000).unwrap(),
            ..Default::default()
        };
        let mut clock = engine(config);
        run(&mut clock, [HIGH, LOW, LOW].into());
        assert!(clock.device().writes.is_empty(), "Falling edges should be ignored");

        run(&mut clock, [HIGH].into());
        assert!(clock.has_ticked(), "Expected a rising edge");
    }

    #[test]
    fn power_up_reading_is_not_an_edge() {
        let mut clock = engine(ClockConfig {
            edge: EdgePolarity::Rising,
            ..Default::default()
        });
        run(&mut clock, [HIGH].into());
        assert!(!clock.has_ticked(), "A high input at power-up should not count");

        let mut clock = engine(ClockConfig::default());
        run(&mut clock, [LOW].into());
        assert!(!clock.has_ticked(), "A low input at power-up should not count");
    }

    #[test]
    fn set_divisor_discards_partial_count() {
        let mut clock = engine(ClockConfig::default());
        clock.set_divisor(3).unwrap();
        run(&mut clock, pulses(2));
        assert_eq!(2, clock.edge_count());

        clock.set_divisor(3).unwrap();
        assert_eq!(0, clock.edge_count(), "Expected left but got right");
        run(&mut clock, pulses(2));
        assert!(!clock.has_ticked(), "Earlier edges should not carry over");
    }

    #[test]
    fn divisor_validation() {
        let mut clock = engine(ClockConfig::default());
        assert_eq!(Err(ConfigurationError::ZeroDivisor), clock.set_divisor(0));
        assert_eq!(1, clock.divisor(), "Rejected divisor should not apply");

        let mut fixed = engine(ClockConfig {
            divisor_support: false,
            ..Default::default()
        });
        assert_eq!(Err(ConfigurationError::DivisorUnsupported), fixed.set_divisor(2));
        assert_eq!(Ok(()), fixed.set_divisor(1));
    }

    #[test]
    fn configuration_errors_are_fatal_at_construction() {
        let unreachable_rate = ClockConfig {
            sample_rate_hz: 0,
            ..Default::default()
        };
        assert_eq!(
            Some(ConfigurationError::UnrepresentableSampleRate { hz: 0 }),
            ClockEngine::new(unreachable_rate, MockDevice::default(), SimulatedTimer::default()).err()
        );

        let inverted = ClockConfig {
            hysteresis: HysteresisBand { low: 10, high: 5 },
            ..Default::default()
        };
        assert_eq!(
            Some(ConfigurationError::InvertedHysteresis { low: 10, high: 5 }),
            ClockEngine::new(inverted, MockDevice::default(), SimulatedTimer::default()).err()
        );
    }

    #[test]
    fn reconfiguring_applies_new_settings() {
        let mut clock = engine(ClockConfig::default());
        clock.set_divisor(4).unwrap();
        clock.start();
        run(&mut clock, pulses(2));

        let rejected = ClockConfig {
            sample_rate_hz: 0,
            ..Default::default()
        };
        assert!(clock.configure(rejected).is_err());
        assert_eq!(2, clock.edge_count(), "A rejected configuration should change nothing");
        assert_eq!(Duration::from_micros(1_000), clock.period());

        let fixed = ClockConfig {
            sample_rate_hz: 500,
            edge: EdgePolarity::Rising,
            divisor_support: false,
            ..Default::default()
        };
        clock.configure(fixed).unwrap();
        assert_eq!(Duration::from_micros(2_000), clock.period(), "Expected left but got right");
        assert_eq!(0, clock.edge_count(), "Partial count should be discarded");
        assert_eq!(1, clock.divisor(), "Divisor should fall back to 1");
        assert!(clock.timer().is_running(), "A running clock should keep running");

        run(&mut clock, [LOW, HIGH].into());
        assert!(clock.has_ticked(), "Expected a rising edge to step");
    }

    #[test]
    fn stop_preserves_state() {
        let mut clock = engine(ClockConfig {
            sample_rate_hz: 4_000,
            ..Default::default()
        });
        assert_eq!(Duration::from_micros(250), clock.period(), "Expected left but got right");

        clock.set_divisor(2).unwrap();
        clock.set_next_output(7);
        clock.start();
        assert!(clock.timer().is_running());
        run(&mut clock, pulses(2));

        clock.stop();
        assert!(!clock.is_running());
        assert!(!clock.timer().is_running(), "Timer should stop with the engine");
        assert!(clock.has_ticked(), "Pending tick should survive stop");
        assert_eq!(2, clock.divisor(), "Divisor should survive stop");
        assert_eq!(7, clock.next_output(), "Buffered output should survive stop");

        clock.start();
        assert!(clock.is_running());
        assert!(clock.has_ticked(), "Pending tick should survive restart");
    }

    #[test]
    fn double_buffering_writes_previous_computation() {
        let mut clock = engine(ClockConfig::default());
        clock.set_next_output(100);
        run(&mut clock, pulses(1));
        clock.set_next_output(200);
        run(&mut clock, pulses(1));
        assert_eq!(&[100, 200][..], &clock.device().writes[..], "Expected left but got right");
    }

    #[test]
    fn auxiliary_channel_is_read_back() {
        let mut clock = engine(ClockConfig::default());
        run(&mut clock, pulses(1));
        assert_eq!(None, clock.auxiliary(), "No auxiliary channel is configured");

        let mut clock = engine(ClockConfig {
            auxiliary_channel: Some(1),
            ..Default::default()
        });
        assert_eq!(None, clock.auxiliary(), "Nothing sampled yet");
        clock.device.auxiliary = 1234;
        run(&mut clock, [HIGH].into());
        assert_eq!(Some(1234), clock.auxiliary(), "Expected left but got right");
        assert!(!clock.has_ticked(), "Auxiliary input should not drive edges");
    }
}
