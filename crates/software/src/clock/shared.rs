use super::ClockEngine;
use crate::{
    configuration::ClockConfig,
    error::ConfigurationError,
    io::{Code, DeviceIo, Sample},
    timer::SampleTimer,
};
use core::cell::RefCell;
use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};

/// A [`ClockEngine`] shared between the sampling interrupt and the main loop.
///
/// Every access runs inside a critical section, so the flag, divisor and buffered output are never observed half
/// updated. Keep the closures handed to [`lock`][Self::lock] short: the sampling interrupt waits on them.
pub struct SharedClock<D, T> {
    engine: Mutex<CriticalSectionRawMutex, RefCell<ClockEngine<D, T>>>,
}

impl<D: DeviceIo, T: SampleTimer> SharedClock<D, T> {
    /// Wraps `engine`.
    pub const fn new(engine: ClockEngine<D, T>) -> Self {
        Self {
            engine: Mutex::new(RefCell::new(engine)),
        }
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn lock<U>(&self, f: impl FnOnce(&mut ClockEngine<D, T>) -> U) -> U {
        self.engine.lock(|engine| f(&mut engine.borrow_mut()))
    }

    /// See [`ClockEngine::sample`].
    pub fn sample(&self) {
        self.lock(ClockEngine::sample)
    }

    /// See [`ClockEngine::has_ticked`].
    pub fn has_ticked(&self) -> bool {
        self.lock(|engine| engine.has_ticked())
    }

    /// See [`ClockEngine::acknowledge`].
    pub fn acknowledge(&self) {
        self.lock(ClockEngine::acknowledge)
    }

    /// See [`ClockEngine::take_tick`].
    ///
    /// Prefer this over a [`has_ticked`][Self::has_ticked] and [`acknowledge`][Self::acknowledge] pair, which can lose
    /// a tick dispatched between the two calls.
    pub fn take_tick(&self) -> bool {
        self.lock(ClockEngine::take_tick)
    }

    /// See [`ClockEngine::set_next_output`].
    pub fn set_next_output(&self, code: Code) {
        self.lock(|engine| engine.set_next_output(code))
    }

    /// See [`ClockEngine::set_divisor`].
    pub fn set_divisor(&self, divisor: u16) -> Result<(), ConfigurationError> {
        self.lock(|engine| engine.set_divisor(divisor))
    }

    /// See [`ClockEngine::auxiliary`].
    pub fn auxiliary(&self) -> Option<Sample> {
        self.lock(|engine| engine.auxiliary())
    }

    /// See [`ClockEngine::configure`].
    pub fn configure(&self, config: ClockConfig) -> Result<(), ConfigurationError> {
        self.lock(|engine| engine.configure(config))
    }

    /// See [`ClockEngine::start`].
    pub fn start(&self) {
        self.lock(ClockEngine::start)
    }

    /// See [`ClockEngine::stop`].
    pub fn stop(&self) {
        self.lock(ClockEngine::stop)
    }
}
