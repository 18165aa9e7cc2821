//! Loop timing and the external stop request

use aquamon_core::traits::{Pause, StopSignal};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use esp_hal::gpio::Input;
use log::info;

const DEBOUNCE_MS: u64 = 50;

/// Raised once when the user asks the loop to stop
pub static STOP: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Delays on the embassy time driver
pub struct EmbassyPause;

impl Pause for EmbassyPause {
    async fn pause_ms(&mut self, ms: u64) {
        Timer::after(Duration::from_millis(ms)).await;
    }
}

/// [`StopSignal`] backed by a static embassy signal
pub struct SignalStop(pub &'static Signal<CriticalSectionRawMutex, ()>);

impl StopSignal for SignalStop {
    fn is_requested(&mut self) -> bool {
        self.0.signaled()
    }

    async fn wait(&mut self) {
        self.0.wait().await;
        // Keep the request visible to later checks
        self.0.signal(());
    }
}

/// Raise [`STOP`] on the first debounced press of `button`
#[embassy_executor::task]
pub async fn stop_button_watcher(mut button: Input<'static>) {
    info!("Press the BOOT button to stop");

    loop {
        button.wait_for_falling_edge().await;

        // Debounce delay - wait for button to stabilize
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;

        if button.is_low() {
            info!("Stop requested");
            STOP.signal(());
            return;
        }
    }
}
