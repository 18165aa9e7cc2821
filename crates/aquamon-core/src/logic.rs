//! Business logic layer (hardware-independent)
//!
//! One cycle is: request a temperature conversion, wait for it, read the
//! probe and both analog channels, publish the reading, sleep. The driver
//! repeats this until a stop is requested or a step fails.

use embassy_futures::select::{Either, select};
use log::{error, info, warn};

use crate::config::{MqttConfig, SamplingConfig};
use crate::error::{CycleError, SensorError};
use crate::model::Reading;
use crate::payload::{self, PayloadFormat};
use crate::scaling;
use crate::traits::{AnalogChannel, AnalogInputs, Pause, Publish, StopSignal, TemperatureProbe};

/// Acquires one [`Reading`] per cycle
pub struct Sampler<T, A> {
    probe: T,
    analog: A,
    config: SamplingConfig,
    probe_present: bool,
}

impl<T: TemperatureProbe, A: AnalogInputs> Sampler<T, A> {
    pub fn new(probe: T, analog: A, config: SamplingConfig) -> Self {
        Self {
            probe,
            analog,
            config,
            probe_present: false,
        }
    }

    /// Look for temperature probes once; the outcome holds for the process lifetime
    pub fn discover(&mut self) -> Result<usize, SensorError> {
        let count = self.probe.discover()?;
        self.probe_present = count > 0;
        if !self.probe_present {
            warn!(
                "No temperature probe found, reporting {} °C",
                self.config.fallback_celsius
            );
        }
        Ok(count)
    }

    pub fn probe_present(&self) -> bool {
        self.probe_present
    }

    /// Start the temperature conversion, if there is a probe to convert
    pub fn begin(&mut self) -> Result<(), SensorError> {
        if self.probe_present {
            self.probe.start_conversion()?;
        }
        Ok(())
    }

    /// Collect the converted temperature and both analog channels
    pub fn finish(&mut self) -> Result<Reading, SensorError> {
        let temperature = if self.probe_present {
            self.probe.read_celsius()?
        } else {
            self.config.fallback_celsius
        };

        let full_scale = self.config.adc_full_scale;
        let ph_raw = self.analog.read_raw(AnalogChannel::Ph)?;
        let oxygen_raw = self.analog.read_raw(AnalogChannel::DissolvedOxygen)?;

        Ok(Reading::new(
            temperature,
            scaling::scale(ph_raw, full_scale, self.config.ph_max),
            scaling::scale(oxygen_raw, full_scale, self.config.oxygen_max),
        ))
    }
}

/// Run a startup step unless a stop request comes first
///
/// `None` means the step was abandoned because of the stop. Bootstrap can
/// wait forever for the access point, so it is raced the same way the loop
/// pauses are.
pub async fn unless_stopped<S, F>(stop: &mut S, step: F) -> Option<F::Output>
where
    S: StopSignal,
    F: Future,
{
    if stop.is_requested() {
        return None;
    }
    match select(step, stop.wait()).await {
        Either::First(output) => Some(output),
        Either::Second(()) => None,
    }
}

/// Renders readings and hands them to a [`Publish`] implementation
pub struct ReadingPublisher<P> {
    client: P,
    topic: &'static str,
    format: PayloadFormat,
}

impl<P: Publish> ReadingPublisher<P> {
    pub fn new(client: P, config: &MqttConfig) -> Self {
        Self {
            client,
            topic: config.topic,
            format: config.format,
        }
    }

    pub async fn publish_reading(&mut self, reading: &Reading) -> Result<(), CycleError<P::Error>> {
        let body = payload::render(reading, self.format)?;
        self.client
            .publish(self.topic, body.as_bytes())
            .await
            .map_err(CycleError::Publish)?;
        info!("Published: {}", body);
        Ok(())
    }

    pub fn into_inner(self) -> P {
        self.client
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Drives sample → wait → sample → publish → sleep until stopped
pub struct LoopDriver<T, A, P, W, S> {
    sampler: Sampler<T, A>,
    publisher: ReadingPublisher<P>,
    pause: W,
    stop: S,
    conversion_delay_ms: u64,
    publish_interval_ms: u64,
    state: RunState,
    cycles: u32,
}

impl<T, A, P, W, S> LoopDriver<T, A, P, W, S>
where
    T: TemperatureProbe,
    A: AnalogInputs,
    P: Publish,
    W: Pause,
    S: StopSignal,
{
    pub fn new(
        sampler: Sampler<T, A>,
        publisher: ReadingPublisher<P>,
        pause: W,
        stop: S,
        config: &SamplingConfig,
    ) -> Self {
        Self {
            sampler,
            publisher,
            pause,
            stop,
            conversion_delay_ms: config.conversion_delay_ms,
            publish_interval_ms: config.publish_interval_ms,
            state: RunState::Running,
            cycles: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Completed publishes so far
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Loop until a stop request; any failure ends the loop still `Running`
    pub async fn run(&mut self) -> Result<(), CycleError<P::Error>> {
        loop {
            if self.stop.is_requested() {
                break;
            }
            match self.cycle().await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break,
                Err(e) => {
                    error!("Cycle {} failed: {}", self.cycles + 1, e);
                    return Err(e);
                }
            }
        }

        self.state = RunState::Stopped;
        info!("Stopped by user");
        Ok(())
    }

    async fn cycle(&mut self) -> Result<Flow, CycleError<P::Error>> {
        self.sampler.begin()?;
        if self.pause_or_stop(self.conversion_delay_ms).await == Flow::Stop {
            return Ok(Flow::Stop);
        }

        let reading = self.sampler.finish()?;
        self.publisher.publish_reading(&reading).await?;
        self.cycles += 1;

        Ok(self.pause_or_stop(self.publish_interval_ms).await)
    }

    async fn pause_or_stop(&mut self, ms: u64) -> Flow {
        match select(self.pause.pause_ms(ms), self.stop.wait()).await {
            Either::First(()) => Flow::Continue,
            Either::Second(()) => Flow::Stop,
        }
    }

    /// Hand back the publisher so the session can be closed
    pub fn into_publisher(self) -> P {
        self.publisher.into_inner()
    }
}
