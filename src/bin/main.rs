#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{
    gpio::{Input, InputConfig, Pull},
    timer::timg::TimerGroup,
};
use log::{error, info};

use aquamon::{
    config,
    control::{self, EmbassyPause, STOP, SignalStop},
    hardware,
    mqtt::MqttSession,
    network::{Connectivity, NetworkError},
};
use aquamon_core::{
    LoopDriver, Sampler,
    logic::{ReadingPublisher, unless_stopped},
};

esp_bootloader_esp_idf::esp_app_desc!();

async fn halt() -> ! {
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    esp_println::println!("=== Aquamon water monitor ===");

    // Initialize RTOS timer for embassy
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let cfg = config::load();
    if let Err(e) = cfg.validate() {
        error!("Invalid configuration: {}", e);
        halt().await;
    }

    let boot_button = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    );
    if let Err(e) = spawner.spawn(control::stop_button_watcher(boot_button)) {
        error!("Failed to spawn stop watcher: {:?}", e);
    }

    let mut stop = SignalStop(&STOP);

    // Association may never complete; the stop button still has to work
    let wifi = peripherals.WIFI;
    let bootstrap = async move {
        let net = Connectivity::start(spawner, wifi, &cfg.wifi).await?;
        let session = MqttSession::open(net.stack(), &cfg.mqtt).await?;
        Ok::<_, NetworkError>((net, session))
    };
    let (net, session) = match unless_stopped(&mut stop, bootstrap).await {
        Some(Ok(connected)) => connected,
        Some(Err(e)) => {
            error!("Network bring-up failed: {}", e);
            halt().await
        }
        None => {
            info!("Stopped by user");
            return;
        }
    };

    let probe = hardware::temperature_probe(peripherals.GPIO4);
    let analog = hardware::AnalogFrontEnd::new(peripherals.ADC1, peripherals.GPIO5, peripherals.GPIO6);
    let mut sampler = Sampler::new(probe, analog, cfg.sampling);
    // Only an empty bus selects the fallback temperature; a faulty one is fatal
    if let Err(e) = sampler.discover() {
        error!("Temperature probe discovery failed: {}", e);
        halt().await;
    }

    let mut driver = LoopDriver::new(
        sampler,
        ReadingPublisher::new(session, &cfg.mqtt),
        EmbassyPause,
        stop,
        &cfg.sampling,
    );

    match driver.run().await {
        Ok(()) => {
            info!("Publishes sent: {}", driver.cycles());
            drop(driver.into_publisher());
            net.shutdown().await;
            info!("Shutdown complete");
        }
        Err(e) => {
            error!("Telemetry loop aborted: {}", e);
            halt().await;
        }
    }
}
