//! Build-time configuration
//!
//! `build.rs` forwards the deployment settings as compile-time environment;
//! anything left unset keeps the default from [`Config::default`].

use aquamon_core::config::{Config, MqttConfig, SamplingConfig, WifiConfig};
use aquamon_core::payload::PayloadFormat;
use log::warn;

/// Configuration baked into this firmware image
pub fn load() -> Config {
    let defaults = Config::default();

    let broker_port = match option_env!("MQTT_PORT") {
        Some(port) => port.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid MQTT_PORT {:?}", port);
            defaults.mqtt.broker_port
        }),
        None => defaults.mqtt.broker_port,
    };

    let format = match option_env!("PAYLOAD_FORMAT") {
        Some(name) => PayloadFormat::from_name(name).unwrap_or_else(|| {
            warn!("Ignoring unknown PAYLOAD_FORMAT {:?}", name);
            defaults.mqtt.format
        }),
        None => defaults.mqtt.format,
    };

    Config {
        wifi: WifiConfig {
            ssid: option_env!("WIFI_SSID").unwrap_or(defaults.wifi.ssid),
            password: option_env!("WIFI_PASSWORD").unwrap_or(defaults.wifi.password),
            ..defaults.wifi
        },
        mqtt: MqttConfig {
            broker_host: option_env!("MQTT_BROKER").unwrap_or(defaults.mqtt.broker_host),
            broker_port,
            client_id: option_env!("MQTT_CLIENT_ID").unwrap_or(defaults.mqtt.client_id),
            topic: option_env!("MQTT_TOPIC").unwrap_or(defaults.mqtt.topic),
            format,
            ..defaults.mqtt
        },
        sampling: SamplingConfig::default(),
    }
}
