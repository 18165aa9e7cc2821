//! Network smoke test
//!
//! Associates with the configured access point, opens the broker session and
//! publishes a single fixed reading, then releases the link. No probes need
//! to be attached.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};

use aquamon::{config, mqtt::MqttSession, network::Connectivity};
use aquamon_core::{Reading, logic::ReadingPublisher};

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    esp_println::println!("=== Wi-Fi / MQTT smoke test ===");

    let cfg = config::load();
    match cfg.validate() {
        Ok(()) => info!("SSID {:?}, broker {}:{}", cfg.wifi.ssid, cfg.mqtt.broker_host, cfg.mqtt.broker_port),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    }

    let net = match Connectivity::start(spawner, peripherals.WIFI, &cfg.wifi).await {
        Ok(net) => net,
        Err(e) => {
            error!("✗ Network bring-up failed: {}", e);
            return;
        }
    };
    esp_println::println!("✓ Associated and addressed");

    match MqttSession::open(net.stack(), &cfg.mqtt).await {
        Ok(session) => {
            esp_println::println!("✓ Broker session open");
            let mut publisher = ReadingPublisher::new(session, &cfg.mqtt);
            match publisher
                .publish_reading(&Reading::new(cfg.sampling.fallback_celsius, 7.0, 10.0))
                .await
            {
                Ok(()) => esp_println::println!("✓ Test reading published to {}", cfg.mqtt.topic),
                Err(e) => esp_println::println!("✗ Publish failed: {}", e),
            }
        }
        Err(e) => esp_println::println!("✗ Broker session failed: {}", e),
    }

    // Let the last frame leave before dropping the link
    Timer::after(Duration::from_millis(500)).await;
    net.shutdown().await;
    esp_println::println!("Done");
}
