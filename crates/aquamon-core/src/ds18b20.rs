//! DS18x20 temperature probes on a one-wire bus
//!
//! Supports the 12-bit DS18B20 / DS1822 and the 9-bit DS18S20, whose extended
//! resolution is recovered from COUNT_REMAIN.

use heapless::Vec;
use log::{debug, info};

use crate::error::{OneWireError, SensorError};
use crate::onewire::{self, MAX_DEVICES, OneWireBus, RomCode};
use crate::traits::TemperatureProbe;

pub const FAMILY_DS18S20: u8 = 0x10;
pub const FAMILY_DS1822: u8 = 0x22;
pub const FAMILY_DS18B20: u8 = 0x28;

const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xBE;

/// Whether a family code belongs to a supported temperature probe
pub fn is_temperature_family(family: u8) -> bool {
    matches!(family, FAMILY_DS18S20 | FAMILY_DS1822 | FAMILY_DS18B20)
}

/// Decode the temperature held in a CRC-checked scratchpad
pub fn decode_scratchpad(family: u8, pad: &[u8; 9]) -> Result<f32, OneWireError> {
    if onewire::crc8(&pad[..8]) != pad[8] {
        return Err(OneWireError::CrcMismatch);
    }

    let raw = i16::from_le_bytes([pad[0], pad[1]]);
    if family == FAMILY_DS18S20 {
        let count_remain = pad[6] as f32;
        let count_per_c = pad[7] as f32;
        if count_per_c == 0.0 {
            return Ok(raw as f32 / 2.0);
        }
        Ok((raw >> 1) as f32 - 0.25 + (count_per_c - count_remain) / count_per_c)
    } else {
        Ok(raw as f32 / 16.0)
    }
}

/// All DS18x20 probes on one bus; the first one discovered is read
pub struct Ds18b20<B> {
    bus: B,
    devices: Vec<RomCode, MAX_DEVICES>,
}

impl<B: OneWireBus> Ds18b20<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            devices: Vec::new(),
        }
    }

    /// ROM codes found by the last discovery
    pub fn devices(&self) -> &[RomCode] {
        &self.devices
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Read and decode the scratchpad of one probe
    pub fn read_device(&mut self, rom: &RomCode) -> Result<f32, SensorError> {
        self.bus.select(rom)?;
        self.bus.write_byte(READ_SCRATCHPAD)?;

        let mut pad = [0u8; 9];
        self.bus.read_bytes(&mut pad)?;
        debug!("Scratchpad of {}: {:02X?}", rom, pad);

        Ok(decode_scratchpad(rom.family(), &pad)?)
    }
}

impl<B: OneWireBus> TemperatureProbe for Ds18b20<B> {
    fn discover(&mut self) -> Result<usize, SensorError> {
        let found = onewire::search(&mut self.bus)?;
        self.devices = found
            .into_iter()
            .filter(|rom| is_temperature_family(rom.family()))
            .collect();

        for rom in &self.devices {
            info!("Found DS18x20 device: {}", rom);
        }
        Ok(self.devices.len())
    }

    fn start_conversion(&mut self) -> Result<(), SensorError> {
        self.bus.skip()?;
        self.bus.write_byte(CONVERT_T)?;
        Ok(())
    }

    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let rom = *self.devices.first().ok_or(SensorError::NoDevice)?;
        self.read_device(&rom)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::onewire::fake::{FakeBus, FakeDevice, rom, scratchpad};

    fn probe(family: u8, serial: u8, raw: i16) -> FakeDevice {
        FakeDevice {
            rom: rom(family, [serial, 0, 0, 0, 0, 0]),
            scratchpad: scratchpad(raw, 0x0C, 0x10),
        }
    }

    #[test]
    fn test_decode_ds18b20_values() {
        let pad = scratchpad(0x0191, 0x0C, 0x10);
        assert_eq!(decode_scratchpad(FAMILY_DS18B20, &pad), Ok(25.0625));

        let pad = scratchpad(0xFF5Eu16 as i16, 0x0C, 0x10);
        assert_eq!(decode_scratchpad(FAMILY_DS18B20, &pad), Ok(-10.125));

        let pad = scratchpad(0x0550, 0x0C, 0x10);
        assert_eq!(decode_scratchpad(FAMILY_DS18B20, &pad), Ok(85.0));
    }

    #[test]
    fn test_decode_ds18s20_extended_resolution() {
        // +25.0 °C raw with COUNT_REMAIN 0x0C, COUNT_PER_C 0x10
        let pad = scratchpad(0x0032, 0x0C, 0x10);
        assert_eq!(decode_scratchpad(FAMILY_DS18S20, &pad), Ok(25.0));
    }

    #[test]
    fn test_decode_rejects_bad_crc() {
        let mut pad = scratchpad(0x0191, 0x0C, 0x10);
        pad[0] ^= 0x01;
        assert_eq!(
            decode_scratchpad(FAMILY_DS18B20, &pad),
            Err(OneWireError::CrcMismatch)
        );
    }

    #[test]
    fn test_discover_keeps_temperature_families() {
        let other = FakeDevice {
            rom: rom(0x01, [9, 9, 9, 9, 9, 9]),
            scratchpad: [0; 9],
        };
        let bus = FakeBus::new(std::vec![probe(FAMILY_DS18B20, 1, 0x0191), other]);
        let mut sensor = Ds18b20::new(bus);

        assert_eq!(sensor.discover(), Ok(1));
        assert_eq!(sensor.devices()[0].family(), FAMILY_DS18B20);
    }

    #[test]
    fn test_discover_empty_bus() {
        let mut sensor = Ds18b20::new(FakeBus::new(Vec::new()));
        assert_eq!(sensor.discover(), Ok(0));
        assert_eq!(sensor.read_celsius(), Err(SensorError::NoDevice));
    }

    #[test]
    fn test_conversion_then_read() {
        let bus = FakeBus::new(std::vec![probe(FAMILY_DS18B20, 1, 0x0191)]);
        let mut sensor = Ds18b20::new(bus);
        sensor.discover().unwrap();

        sensor.start_conversion().unwrap();
        assert_eq!(sensor.bus_mut().conversions, 1);

        assert_eq!(sensor.read_celsius(), Ok(25.0625));
    }

    #[test]
    fn test_reads_first_discovered_device() {
        let bus = FakeBus::new(std::vec![
            probe(FAMILY_DS18B20, 0x02, 0x0190),
            probe(FAMILY_DS18B20, 0x01, 0x0320),
        ]);
        let mut sensor = Ds18b20::new(bus);
        assert_eq!(sensor.discover(), Ok(2));

        let first = sensor.devices()[0];
        let expected = if first.0[1] == 0x01 { 50.0 } else { 25.0 };
        assert_eq!(sensor.read_celsius(), Ok(expected));
    }

    #[test]
    fn test_conversion_without_presence_fails() {
        let mut sensor = Ds18b20::new(FakeBus::new(Vec::new()));
        assert_eq!(
            sensor.start_conversion(),
            Err(SensorError::Bus(OneWireError::NoPresence))
        );
    }
}
