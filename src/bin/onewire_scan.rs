//! One-wire bus scan
//!
//! Runs a ROM search on the temperature probe pin and prints every device
//! found with its family. Useful for checking the pull-up and
//! wiring before flashing the monitor.
//!
//! Following pins are used:
//! - DQ => GPIO4 (4.7 kΩ pull-up to 3.3 V)

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;

use aquamon::hardware;
use aquamon_core::{ds18b20, onewire};

esp_bootloader_esp_idf::esp_app_desc!();

const RESCAN_INTERVAL_SECS: u64 = 5;

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let mut probe = hardware::temperature_probe(peripherals.GPIO4);

    loop {
        esp_println::println!("One-wire scan start");
        match onewire::search(probe.bus_mut()) {
            Ok(roms) if roms.is_empty() => {
                esp_println::println!("No presence pulse, check wiring and pull-up");
            }
            Ok(roms) => {
                for rom in &roms {
                    let kind = match rom.family() {
                        ds18b20::FAMILY_DS18S20 => "DS18S20",
                        ds18b20::FAMILY_DS1822 => "DS1822",
                        ds18b20::FAMILY_DS18B20 => "DS18B20",
                        _ => "unknown",
                    };
                    esp_println::println!("Found {} at {}", kind, rom);
                }
                esp_println::println!("{} device(s)", roms.len());
            }
            Err(e) => esp_println::println!("Search failed: {}", e),
        }

        Timer::after(Duration::from_secs(RESCAN_INTERVAL_SECS)).await;
    }
}
