use aquamon_core::ds18b20::Ds18b20;
use aquamon_core::error::{OneWireError, SensorError};
use aquamon_core::onewire::{OneWireBus, PinBus};
use aquamon_core::traits::{AnalogChannel, AnalogInputs};
use esp_hal::{
    Blocking,
    analog::adc::{Adc, AdcConfig, AdcPin, Attenuation},
    delay::Delay,
    gpio::{AnyPin, DriveMode, Flex, InputConfig, OutputConfig, Pull},
    peripherals::{ADC1, GPIO5, GPIO6},
};

/// Polls of a oneshot conversion before the ADC is declared stuck
const ADC_MAX_POLLS: u32 = 10_000;

/// Temperature probe on the one-wire data pin
pub type TemperatureProbe<'a> = Ds18b20<GuardedBus<PinBus<Flex<'a>, Delay>>>;

/// Runs every one-wire slot with interrupts masked
///
/// Read and write slots have windows of a few microseconds; an interrupt
/// landing inside one corrupts the bit. A reset is under 1 ms.
pub struct GuardedBus<B>(B);

impl<B: OneWireBus> OneWireBus for GuardedBus<B> {
    fn reset(&mut self) -> Result<bool, OneWireError> {
        critical_section::with(|_| self.0.reset())
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), OneWireError> {
        critical_section::with(|_| self.0.write_bit(bit))
    }

    fn read_bit(&mut self) -> Result<bool, OneWireError> {
        critical_section::with(|_| self.0.read_bit())
    }
}

/// Open-drain one-wire master on `data`, relying on the external pull-up
pub fn temperature_probe<'a, DATA>(data: DATA) -> TemperatureProbe<'a>
where
    DATA: Into<AnyPin<'a>>,
{
    let mut pin = Flex::new(data.into());
    pin.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    pin.apply_input_config(&InputConfig::default().with_pull(Pull::Up));
    pin.set_high();
    pin.set_input_enable(true);
    pin.set_output_enable(true);

    Ds18b20::new(GuardedBus(PinBus::new(pin, Delay::new())))
}

/// pH and dissolved-oxygen probes on ADC1
pub struct AnalogFrontEnd<'a> {
    adc: Adc<'a, ADC1<'a>, Blocking>,
    ph: AdcPin<GPIO5<'a>, ADC1<'a>>,
    oxygen: AdcPin<GPIO6<'a>, ADC1<'a>>,
}

impl<'a> AnalogFrontEnd<'a> {
    /// Both channels at 11 dB attenuation for the full 0–3.3 V range
    pub fn new(adc1: ADC1<'a>, ph_gpio: GPIO5<'a>, oxygen_gpio: GPIO6<'a>) -> Self {
        let mut config = AdcConfig::new();
        let ph = config.enable_pin(ph_gpio, Attenuation::_11dB);
        let oxygen = config.enable_pin(oxygen_gpio, Attenuation::_11dB);
        let adc = Adc::new(adc1, config);

        Self { adc, ph, oxygen }
    }
}

impl AnalogInputs for AnalogFrontEnd<'_> {
    fn read_raw(&mut self, channel: AnalogChannel) -> Result<u16, SensorError> {
        for _ in 0..ADC_MAX_POLLS {
            let sample = match channel {
                AnalogChannel::Ph => self.adc.read_oneshot(&mut self.ph),
                AnalogChannel::DissolvedOxygen => self.adc.read_oneshot(&mut self.oxygen),
            };
            if let Ok(raw) = sample {
                return Ok(raw);
            }
        }

        Err(SensorError::Adc {
            channel: channel.name(),
        })
    }
}
