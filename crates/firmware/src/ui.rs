//! The mode button and its indicator LED.

use defmt::*;
use embassy_stm32::{exti::ExtiInput, gpio::Output};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    watch::{Receiver, Sender, Watch},
};
use embassy_time::Timer;
use shift_register_cv_lib::configuration::{CycleConfig, ModeSelection};

const MODE_RECEIVER_CNT: usize = 2;
type ModeSync = Watch<CriticalSectionRawMutex, ModeSelection, MODE_RECEIVER_CNT>;
pub type ModeSender<'a> = Sender<'a, CriticalSectionRawMutex, ModeSelection, MODE_RECEIVER_CNT>;
pub type ModeReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, ModeSelection, MODE_RECEIVER_CNT>;

/// Which parameter the knob is assigned to.
pub static MODE_SYNC: ModeSync = Watch::new();

/// Handles button presses, cycling through the [`ModeSelection`]s.
#[embassy_executor::task]
pub async fn mode_input_task(mut button: ExtiInput<'static>, mode: ModeSender<'static>) -> ! {
    loop {
        button.wait_for_rising_edge().await;
        let selection = mode.try_get().unwrap_or_default().cycle();
        info!("Knob assigned to {}", selection);
        mode.send(selection);
    }
}

/// Blinks the selected [`ModeSelection`].
///
/// Each cycle is split in half: dark for one half, and N blinks in the other, where N is one more than the index of
/// the selection.
#[embassy_executor::task]
pub async fn mode_display_task(mut led: Output<'static>, mut mode: ModeReceiver<'static>) -> ! {
    const BLINK_SLEEP_US: u64 = 1_000_000;

    loop {
        led.set_low();
        Timer::after_micros(BLINK_SLEEP_US).await;

        // zero-based, so add one for the first selection to blink at all
        let blink_cnt = (mode.try_get().unwrap_or_default() as u8).saturating_add(1);
        // doubled for the dark frames; one less so the animation starts and ends lit
        let animation_frames = blink_cnt * 2 - 1;
        for _ in 0..animation_frames {
            led.toggle();
            Timer::after_micros(BLINK_SLEEP_US / u64::from(animation_frames)).await;
        }
    }
}
