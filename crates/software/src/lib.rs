//! This crate contains architecture-agnostic logic for a clocked shift-register sequencer module for modular
//! synthesizers. An external clock pulse is sampled and optionally divided; each resulting step advances a
//! pseudo-random bit sequence whose low byte is read as a note, snapped to a musical scale and emitted as a
//! [CV](https://en.wikipedia.org/wiki/CV/gate) code through a digital-to-analog converter.
//!
//! Board-specific glue (ADC/DAC access, the periodic timer, buttons and LEDs) lives in the firmware crate; everything
//! here runs on the host as well, which is where its tests execute.

#![deny(missing_docs)]
#![no_std]

// must come first so the logging macros are visible to the modules below
#[macro_use]
mod fmt;

pub mod clock;
pub mod configuration;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod profiler;
pub mod quantizer;
pub mod sequencer;
pub mod timer;
pub mod ui;
