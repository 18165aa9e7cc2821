//! Hardware abstraction traits

use crate::error::SensorError;

/// Trait for one-wire temperature probes
pub trait TemperatureProbe {
    /// Enumerate probes on the bus, returning how many were found
    fn discover(&mut self) -> Result<usize, SensorError>;

    /// Ask every probe to start a conversion
    fn start_conversion(&mut self) -> Result<(), SensorError>;

    /// Read the last conversion of the first probe in Celsius
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

/// Analog probe inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogChannel {
    Ph,
    DissolvedOxygen,
}

impl AnalogChannel {
    pub fn name(self) -> &'static str {
        match self {
            AnalogChannel::Ph => "pH",
            AnalogChannel::DissolvedOxygen => "dissolved oxygen",
        }
    }
}

/// Trait for the ADC front end
pub trait AnalogInputs {
    /// One raw conversion of `channel`
    fn read_raw(&mut self, channel: AnalogChannel) -> Result<u16, SensorError>;
}

/// Minimal publish interface, decoupled from any MQTT client crate
pub trait Publish {
    type Error: core::fmt::Debug;

    /// Send `payload` to `topic` once, fire and forget
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Trait for the fixed delays of the loop
pub trait Pause {
    fn pause_ms(&mut self, ms: u64) -> impl Future<Output = ()>;
}

/// External stop request
pub trait StopSignal {
    /// Whether a stop was already requested
    fn is_requested(&mut self) -> bool;

    /// Resolve once a stop is requested
    fn wait(&mut self) -> impl Future<Output = ()>;
}
