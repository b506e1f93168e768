//! Firmware for a clocked shift-register sequencer module, running on the [Nucleo-F767ZI development
//! board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html).
//!
//! An external clock is sampled on A0 at a fixed rate by a task in a high-priority interrupt executor. Every few
//! clock edges (as set by the divisor) the module writes a new control voltage on the DAC (PA4) and the main loop
//! computes the one after it: the shift register steps, its low byte becomes a note, the note snaps to the selected
//! scale and is looked up in the voltage table.
//!
//! The blue user button cycles which parameter the knob on A1 adjusts (flip probability, clock divisor, octave range
//! or scale); the red LED blinks the selection and the green LED toggles on every step.

#![no_std]
#![no_main]

mod board;
mod ui;

use crate::{
    board::{Board, CLOCK_CHANNEL, KNOB_CHANNEL, SAMPLING_SYNC, SamplingReceiver, TickerTimer},
    ui::{MODE_SYNC, ModeReceiver, mode_display_task, mode_input_task},
};
use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_futures::{
    select::{Either, select},
    yield_now,
};
use embassy_stm32::{
    Config,
    adc::{Adc, SampleTime},
    bind_interrupts,
    dac::Dac,
    exti::ExtiInput,
    gpio::{Level, Output, Pull, Speed},
    interrupt::{self, InterruptExt, Priority},
    peripherals,
    rng::{self, Rng},
    time::Hertz,
};
use embassy_time::{Instant, Ticker};
use rand::{SeedableRng, rngs::SmallRng};
use shift_register_cv_lib::{
    clock::{ClockEngine, SharedClock},
    configuration::{ClockConfig, CycleConfig, EdgePolarity, ModeSelection},
    pipeline::NotePipeline,
    profiler::LoopProfiler,
    quantizer::Quantizer,
    sequencer::ShiftRegister,
    ui::{Mode, Setting, UiMode},
};
use static_cell::StaticCell;

#[cfg(feature = "defmt-rtt")]
use defmt_rtt as _;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        RNG => rng::InterruptHandler<peripherals::RNG>;
    }
);

type Clock = SharedClock<Board, TickerTimer>;

const MODE_CNT: usize = ModeSelection::Scale as usize + 1;

/// Main-loop iterations per profiler report.
const PROFILE_WINDOWS: u32 = 100_000;

/// Runs the sampling task, preempting everything else.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[embassy_stm32::interrupt]
unsafe fn UART4() {
    unsafe { EXECUTOR_HIGH.on_interrupt() }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing shift register CV");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock, supplied by the on-board ST-LINK
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz
            divq: Some(PllQDiv::DIV9), // 8mhz / 4 * 216 / 9 = 48Mhz, for the RNG
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
    }
    let p = embassy_stm32::init(config);

    let mut rng = Rng::new(p.RNG, Irqs);
    let mut entropy = [0u8; 10];
    unwrap!(rng.async_fill_bytes(&mut entropy).await);
    let [a, b, c, d, e, f, g, h, seed_lo, seed_hi] = entropy;
    let register = ShiftRegister::new(
        SmallRng::seed_from_u64(u64::from_le_bytes([a, b, c, d, e, f, g, h])),
        u16::from_le_bytes([seed_lo, seed_hi]),
    );
    let mut pipeline = NotePipeline::new(register, Quantizer::default());

    let mut adc = Adc::new(p.ADC1);
    adc.set_sample_time(SampleTime::CYCLES15);
    // per RM0410, DAC channel 1 outputs on PA4 and channel 2 on PA5
    let (cv_out, spare) = Dac::new(p.DAC1, p.DMA1_CH5, p.DMA1_CH6, p.PA4, p.PA5).split();
    let board = Board::new(adc, p.PA3, p.PC0, cv_out, spare);

    let clock_config = ClockConfig {
        // the clock jack is wired straight to the pin, without an inverting buffer
        edge: EdgePolarity::Rising,
        clock_channel: CLOCK_CHANNEL,
        auxiliary_channel: Some(KNOB_CHANNEL),
        ..Default::default()
    };
    let engine = unwrap!(ClockEngine::new(clock_config, board, TickerTimer::default()));
    static CLOCK: StaticCell<Clock> = StaticCell::new();
    let clock: &'static Clock = CLOCK.init(SharedClock::new(engine));

    // every mode contributes its starting setting
    let mut selection = ModeSelection::default();
    for _ in 0..MODE_CNT {
        apply(&mut pipeline, clock, Mode::from(selection).init());
        selection = selection.cycle();
    }

    // the first step must have a code waiting before any edge can arrive
    let first = pipeline.prime(clock);
    info!("First note {} at code {}", first.note, first.code);

    interrupt::UART4.set_priority(Priority::P6);
    let spawner_high = EXECUTOR_HIGH.start(interrupt::UART4);
    let schedule = unwrap!(SAMPLING_SYNC.receiver());
    unwrap!(spawner_high.spawn(sampling_task(clock, schedule)));
    clock.start();

    let mode_sender = MODE_SYNC.sender();
    mode_sender.send(ModeSelection::default());

    let button = ExtiInput::new(p.PC13, p.EXTI13, Pull::None);
    unwrap!(spawner.spawn(mode_input_task(button, mode_sender)));

    let red_led = Output::new(p.PB14, Level::Low, Speed::Low);
    unwrap!(spawner.spawn(mode_display_task(red_led, unwrap!(MODE_SYNC.receiver()))));

    let green_led = Output::new(p.PB0, Level::Low, Speed::Low);
    unwrap!(spawner.spawn(sequencer_task(
        clock,
        pipeline,
        green_led,
        unwrap!(MODE_SYNC.receiver())
    )));
}

/// Calls [`SharedClock::sample`] once per period for as long as the clock runs.
#[embassy_executor::task]
async fn sampling_task(clock: &'static Clock, mut schedule: SamplingReceiver<'static>) -> ! {
    loop {
        let Some(period) = schedule.changed().await else {
            continue;
        };
        info!("Sampling every {} us", period.as_micros());

        let mut ticker = Ticker::every(period);
        loop {
            match select(ticker.next(), schedule.changed()).await {
                Either::First(()) => clock.sample(),
                Either::Second(Some(period)) => ticker = Ticker::every(period),
                Either::Second(None) => break,
            }
        }
        info!("Sampling stopped");
    }
}

/// The main loop: consumes ticks, reads the knob and applies whatever it asks for.
#[embassy_executor::task]
async fn sequencer_task(
    clock: &'static Clock,
    mut pipeline: NotePipeline<SmallRng>,
    mut step_led: Output<'static>,
    mut selection: ModeReceiver<'static>,
) -> ! {
    let mut profiler = LoopProfiler::new(PROFILE_WINDOWS);
    // replaced, with pickup armed, as soon as the first selection arrives
    let mut mode = Mode::default();

    loop {
        let started = Instant::now();

        if let Some(step) = pipeline.on_tick(clock) {
            step_led.toggle();
            trace!("Next note {} buffered as code {}", step.note, step.code);
        }

        if let Some(knob) = clock.auxiliary() {
            if let Some(selected) = selection.try_changed() {
                mode = Mode::from(selected);
                mode.select(knob);
            }
            if let Some(setting) = mode.update(knob) {
                apply(&mut pipeline, clock, setting);
            }
        }

        if let Some(report) = profiler.record(started.elapsed()) {
            info!(
                "Main loop busy {} us on average, {} us at worst, over {} iterations",
                report.average.as_micros(),
                report.worst.as_micros(),
                report.windows
            );
        }

        yield_now().await;
    }
}

/// Hands a [`Setting`] to the pipeline, passing divisors on to the clock.
fn apply(pipeline: &mut NotePipeline<SmallRng>, clock: &Clock, setting: Setting) {
    match pipeline.apply(setting) {
        Ok(Some(divisor)) => {
            if let Err(error) = clock.set_divisor(divisor) {
                warn!("Divisor {} rejected: {}", divisor, error);
            }
        }
        Ok(None) => {}
        Err(error) => warn!("Setting {} rejected: {}", setting, error),
    }
}
