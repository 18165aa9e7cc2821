//! Wi-Fi association and the embassy-net stack
//!
//! Association is polled forever: an unreachable access point keeps the
//! device waiting rather than failing.

use aquamon_core::config::WifiConfig;
use embassy_executor::Spawner;
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Timer};
use esp_hal::{peripherals::WIFI, rng::Rng};
use esp_println::{print, println};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiError};
use log::{error, info, warn};
use static_cell::StaticCell;
use thiserror_no_std::Error;

/// DHCP, DNS and the MQTT socket
const SOCKET_COUNT: usize = 3;

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();

/// Errors from bring-up and the broker session
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("radio initialization failed")]
    Radio,

    #[error("Wi-Fi driver error: {0:?}")]
    Wifi(WifiError),

    #[error("failed to spawn network task")]
    Spawn,

    #[error("DNS lookup of {host} failed")]
    Dns { host: &'static str },

    #[error("TCP connect to broker failed")]
    Connect,

    #[error("MQTT connect refused or failed")]
    MqttConnect,

    #[error("MQTT publish failed")]
    Publish,
}

/// Associated station plus its IP stack, owned by the main task
pub struct Connectivity {
    controller: WifiController<'static>,
    stack: Stack<'static>,
}

impl Connectivity {
    /// Associate with the access point and wait for a DHCP lease
    pub async fn start(
        spawner: Spawner,
        wifi: WIFI<'static>,
        config: &WifiConfig,
    ) -> Result<Self, NetworkError> {
        let radio = esp_radio::init().map_err(|e| {
            error!("esp_radio init failed: {:?}", e);
            NetworkError::Radio
        })?;
        let radio = RADIO.init(radio);

        let (mut controller, interfaces) =
            esp_radio::wifi::new(radio, wifi, Default::default()).map_err(NetworkError::Wifi)?;

        let client = ClientConfig::default()
            .with_ssid(config.ssid.into())
            .with_password(config.password.into());
        controller
            .set_config(&ModeConfig::Client(client))
            .map_err(NetworkError::Wifi)?;
        controller.start().map_err(NetworkError::Wifi)?;
        controller.connect().map_err(NetworkError::Wifi)?;

        print!("Connecting to WiFi...");
        while !controller.is_connected().unwrap_or(false) {
            print!(".");
            Timer::after(Duration::from_millis(config.poll_interval_ms)).await;
        }
        println!();

        let rng = Rng::new();
        let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());

        let (stack, runner) = embassy_net::new(
            interfaces.sta,
            embassy_net::Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            seed,
        );
        spawner
            .spawn(net_task(runner))
            .map_err(|_| NetworkError::Spawn)?;

        stack.wait_config_up().await;
        match stack.config_v4() {
            Some(ip) => info!("Connected: {:?}", ip),
            None => info!("Connected"),
        }

        Ok(Self { controller, stack })
    }

    pub fn stack(&self) -> Stack<'static> {
        self.stack
    }

    /// Leave the access point
    pub async fn shutdown(mut self) {
        if let Err(e) = self.controller.disconnect_async().await {
            warn!("Wi-Fi disconnect failed: {:?}", e);
        }
        info!("Wi-Fi released");
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
