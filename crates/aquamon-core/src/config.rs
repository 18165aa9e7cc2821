//! Runtime configuration for the telemetry loop
//!
//! Credentials and broker coordinates are fixed at build time by the firmware
//! and handed in here as one value; nothing in the loop reads globals.

use crate::error::ConfigError;
use crate::payload::PayloadFormat;

const MAX_SSID_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 64;
const MAX_CLIENT_ID_LEN: usize = 23;

/// Full configuration of the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
    pub sampling: SamplingConfig,
}

/// Wi-Fi station credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
    /// Interval between association checks while waiting for the link
    pub poll_interval_ms: u64,
}

/// Broker coordinates and message shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttConfig {
    /// Broker hostname, resolved via DNS
    pub broker_host: &'static str,
    pub broker_port: u16,
    pub client_id: &'static str,
    pub topic: &'static str,
    /// Keep-alive interval in seconds, 0 disables it
    pub keep_alive_secs: u16,
    pub format: PayloadFormat,
}

/// Acquisition constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    /// Wait between CONVERT T and reading the scratchpad
    pub conversion_delay_ms: u64,
    /// Sleep after each publish
    pub publish_interval_ms: u64,
    /// Temperature reported when no probe was found at startup
    pub fallback_celsius: f32,
    /// Largest raw count the ADC can report
    pub adc_full_scale: u16,
    pub ph_max: f32,
    pub oxygen_max: f32,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: "YOUR_WIFI_NAME",
            password: "YOUR_WIFI_PASSWORD",
            poll_interval_ms: 500,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "broker.hivemq.com",
            broker_port: 1883,
            client_id: "esp32_water_monitor",
            topic: "smartfarm/water",
            keep_alive_secs: 0,
            format: PayloadFormat::Repr,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            conversion_delay_ms: 750,
            publish_interval_ms: 5_000,
            fallback_celsius: 25.0,
            adc_full_scale: 4095,
            ph_max: 14.0,
            oxygen_max: 20.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi: WifiConfig::default(),
            mqtt: MqttConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl Config {
    /// Check every section before any peripheral is touched
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wifi.validate()?;
        self.mqtt.validate()?;
        self.sampling.validate()
    }

    /// Total length of one cycle when nothing fails
    pub fn cycle_period_ms(&self) -> u64 {
        self.sampling.conversion_delay_ms + self.sampling.publish_interval_ms
    }
}

impl WifiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() || self.ssid.len() > MAX_SSID_LEN {
            return Err(ConfigError::InvalidSsid);
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(ConfigError::InvalidPassword);
        }
        Ok(())
    }
}

impl MqttConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() || self.client_id.len() > MAX_CLIENT_ID_LEN {
            return Err(ConfigError::InvalidClientId);
        }
        validate_topic(self.topic)
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.adc_full_scale == 0 {
            return Err(ConfigError::ZeroFullScale);
        }
        Ok(())
    }
}

/// Reject topics a broker would refuse for PUBLISH
pub fn validate_topic(topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::InvalidTopic { reason: "empty" });
    }
    if topic.contains('+') || topic.contains('#') {
        return Err(ConfigError::InvalidTopic {
            reason: "wildcard character",
        });
    }
    if topic.contains('\0') {
        return Err(ConfigError::InvalidTopic {
            reason: "NUL character",
        });
    }
    Ok(())
}
