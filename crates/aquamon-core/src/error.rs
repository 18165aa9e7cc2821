//! Error types for each stage of the telemetry cycle

use thiserror_no_std::Error;

/// Faults on the one-wire bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OneWireError {
    /// The GPIO driving the bus reported an error
    #[error("one-wire pin error")]
    Pin,

    /// No device answered the reset pulse
    #[error("no presence pulse on one-wire bus")]
    NoPresence,

    /// A ROM code or scratchpad failed its CRC-8 check
    #[error("one-wire CRC mismatch")]
    CrcMismatch,
}

/// Failures while acquiring a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("temperature probe bus fault: {0}")]
    Bus(OneWireError),

    /// A read was requested from a probe that was never discovered
    #[error("no temperature probe discovered")]
    NoDevice,

    #[error("ADC read failed on {channel} channel")]
    Adc { channel: &'static str },
}

impl From<OneWireError> for SensorError {
    fn from(err: OneWireError) -> Self {
        SensorError::Bus(err)
    }
}

/// Failures while rendering a reading into a message body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload exceeds {capacity} bytes")]
    Overflow { capacity: usize },
}

/// Invalid configuration values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Wi-Fi SSID must be 1..=32 bytes")]
    InvalidSsid,

    #[error("Wi-Fi password must be at most 64 bytes")]
    InvalidPassword,

    #[error("MQTT client id must be 1..=23 bytes")]
    InvalidClientId,

    /// Topic names may not be empty or carry wildcards or NUL characters
    #[error("invalid MQTT topic: {reason}")]
    InvalidTopic { reason: &'static str },

    #[error("ADC full scale must be non-zero")]
    ZeroFullScale,
}

/// A fatal failure inside one sample-and-publish cycle
#[derive(Debug, Error)]
pub enum CycleError<E> {
    #[error("sampling failed: {0}")]
    Sensor(SensorError),

    #[error("payload rendering failed: {0}")]
    Payload(PayloadError),

    #[error("publish failed: {0:?}")]
    Publish(E),
}

impl<E> From<SensorError> for CycleError<E> {
    fn from(err: SensorError) -> Self {
        CycleError::Sensor(err)
    }
}

impl<E> From<PayloadError> for CycleError<E> {
    fn from(err: PayloadError) -> Self {
        CycleError::Payload(err)
    }
}
