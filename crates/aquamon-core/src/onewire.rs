//! Dallas/Maxim one-wire bus
//!
//! The protocol layer is written against [`OneWireBus`], a bit-level trait, so
//! ROM search and device commands can be exercised without hardware.
//! [`PinBus`] implements the trait by bit-banging an open-drain
//! `embedded-hal` pin with the standard-speed slot timings.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;
use log::warn;

use crate::error::OneWireError;

pub const SEARCH_ROM: u8 = 0xF0;
pub const MATCH_ROM: u8 = 0x55;
pub const SKIP_ROM: u8 = 0xCC;

/// Upper bound on devices collected by a search; the rest of the bus is ignored
pub const MAX_DEVICES: usize = 8;

/// Bit-level access to a one-wire bus
pub trait OneWireBus {
    /// Reset pulse; `true` when at least one device answered with presence
    fn reset(&mut self) -> Result<bool, OneWireError>;

    fn write_bit(&mut self, bit: bool) -> Result<(), OneWireError>;

    fn read_bit(&mut self) -> Result<bool, OneWireError>;

    /// LSB first
    fn write_byte(&mut self, byte: u8) -> Result<(), OneWireError> {
        for i in 0..8 {
            self.write_bit((byte >> i) & 1 == 1)?;
        }
        Ok(())
    }

    /// LSB first
    fn read_byte(&mut self) -> Result<u8, OneWireError> {
        let mut byte = 0;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), OneWireError> {
        bytes.iter().try_for_each(|&b| self.write_byte(b))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), OneWireError> {
        for byte in buf.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(())
    }

    /// Reset, failing when nobody is present
    fn reset_expect_presence(&mut self) -> Result<(), OneWireError> {
        if self.reset()? {
            Ok(())
        } else {
            Err(OneWireError::NoPresence)
        }
    }

    /// Reset and address a single device
    fn select(&mut self, rom: &RomCode) -> Result<(), OneWireError> {
        self.reset_expect_presence()?;
        self.write_byte(MATCH_ROM)?;
        self.write_bytes(&rom.0)
    }

    /// Reset and address every device at once
    fn skip(&mut self) -> Result<(), OneWireError> {
        self.reset_expect_presence()?;
        self.write_byte(SKIP_ROM)
    }
}

/// 64-bit ROM code: family byte, 48-bit serial, CRC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RomCode(pub [u8; 8]);

impl RomCode {
    pub fn family(&self) -> u8 {
        self.0[0]
    }

    /// Whether the trailing byte is the CRC-8 of the first seven
    pub fn is_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.0[7]
    }
}

impl fmt::Display for RomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected)
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Enumerate every device on the bus with the SEARCH ROM binary tree walk
///
/// An empty bus yields an empty list. Collection stops after
/// [`MAX_DEVICES`] codes. A ROM code failing its CRC aborts the search with
/// [`OneWireError::CrcMismatch`].
pub fn search<B: OneWireBus>(bus: &mut B) -> Result<Vec<RomCode, MAX_DEVICES>, OneWireError> {
    let mut found = Vec::new();
    let mut rom = [0u8; 8];
    // 1-based bit position of the last branch where 0 was taken, 0 = none
    let mut last_discrepancy = 0u8;

    loop {
        if !bus.reset()? {
            return Ok(found);
        }
        bus.write_byte(SEARCH_ROM)?;

        let mut last_zero = 0u8;
        for position in 1..=64u8 {
            let id_bit = bus.read_bit()?;
            let complement = bus.read_bit()?;
            if id_bit && complement {
                // Nobody left participating
                return Ok(found);
            }

            let byte = usize::from((position - 1) / 8);
            let mask = 1u8 << ((position - 1) % 8);

            let direction = if id_bit != complement {
                id_bit
            } else {
                let take_one = if position < last_discrepancy {
                    rom[byte] & mask != 0
                } else {
                    position == last_discrepancy
                };
                if !take_one {
                    last_zero = position;
                }
                take_one
            };

            if direction {
                rom[byte] |= mask;
            } else {
                rom[byte] &= !mask;
            }
            bus.write_bit(direction)?;
        }

        let code = RomCode(rom);
        if !code.is_valid() {
            return Err(OneWireError::CrcMismatch);
        }
        if found.push(code).is_err() {
            warn!("More than {} one-wire devices, ignoring the rest", MAX_DEVICES);
            return Ok(found);
        }

        last_discrepancy = last_zero;
        if last_discrepancy == 0 {
            return Ok(found);
        }
    }
}

/// One-wire master over an open-drain GPIO
///
/// The pin must be configured open-drain with a pull-up (the DS18B20 data
/// line also needs an external 4.7 kΩ). Driving it high releases the line.
pub struct PinBus<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> PinBus<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn drive_low(&mut self) -> Result<(), OneWireError> {
        self.pin.set_low().map_err(|_| OneWireError::Pin)
    }

    fn release_line(&mut self) -> Result<(), OneWireError> {
        self.pin.set_high().map_err(|_| OneWireError::Pin)
    }

    fn sample(&mut self) -> Result<bool, OneWireError> {
        self.pin.is_high().map_err(|_| OneWireError::Pin)
    }
}

impl<P, D> OneWireBus for PinBus<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn reset(&mut self) -> Result<bool, OneWireError> {
        self.release_line()?;
        self.drive_low()?;
        self.delay.delay_us(480);
        self.release_line()?;
        self.delay.delay_us(70);
        let present = !self.sample()?;
        self.delay.delay_us(410);
        Ok(present)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), OneWireError> {
        self.drive_low()?;
        if bit {
            self.delay.delay_us(6);
            self.release_line()?;
            self.delay.delay_us(64);
        } else {
            self.delay.delay_us(60);
            self.release_line()?;
            self.delay.delay_us(10);
        }
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, OneWireError> {
        self.drive_low()?;
        self.delay.delay_us(6);
        self.release_line()?;
        self.delay.delay_us(9);
        let bit = self.sample()?;
        self.delay.delay_us(55);
        Ok(bit)
    }
}

/// Simulated bus with DS18x20-like devices for unit tests
#[cfg(test)]
pub(crate) mod fake {
    extern crate std;

    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::*;

    pub const CONVERT_T: u8 = 0x44;
    pub const READ_SCRATCHPAD: u8 = 0xBE;

    pub struct FakeDevice {
        pub rom: RomCode,
        pub scratchpad: [u8; 9],
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Phase {
        Idle,
        RomCommand,
        Search { position: usize, reads: u8 },
        Matching,
        Function,
    }

    pub struct FakeBus {
        pub devices: Vec<FakeDevice>,
        pub resets: usize,
        pub conversions: usize,
        /// Every byte written outside of a search
        pub written: Vec<u8>,
        phase: Phase,
        active: Vec<bool>,
        match_bytes: Vec<u8>,
        pending_byte: u8,
        pending_bits: u8,
        read_queue: VecDeque<bool>,
    }

    /// Build a ROM with a correct CRC
    pub fn rom(family: u8, serial: [u8; 6]) -> RomCode {
        let mut bytes = [0u8; 8];
        bytes[0] = family;
        bytes[1..7].copy_from_slice(&serial);
        bytes[7] = crc8(&bytes[..7]);
        RomCode(bytes)
    }

    /// Build a scratchpad holding `raw` with a correct CRC
    pub fn scratchpad(raw: i16, count_remain: u8, count_per_c: u8) -> [u8; 9] {
        let [lsb, msb] = raw.to_le_bytes();
        let mut pad = [lsb, msb, 0x4B, 0x46, 0x7F, 0xFF, count_remain, count_per_c, 0];
        pad[8] = crc8(&pad[..8]);
        pad
    }

    impl FakeBus {
        pub fn new(devices: Vec<FakeDevice>) -> Self {
            let count = devices.len();
            Self {
                devices,
                resets: 0,
                conversions: 0,
                written: Vec::new(),
                phase: Phase::Idle,
                active: std::vec![true; count],
                match_bytes: Vec::new(),
                pending_byte: 0,
                pending_bits: 0,
                read_queue: VecDeque::new(),
            }
        }

        fn on_byte(&mut self, byte: u8) {
            self.written.push(byte);
            match self.phase {
                Phase::RomCommand => match byte {
                    SEARCH_ROM => {
                        self.phase = Phase::Search {
                            position: 0,
                            reads: 0,
                        }
                    }
                    MATCH_ROM => {
                        self.match_bytes.clear();
                        self.phase = Phase::Matching;
                    }
                    SKIP_ROM => self.phase = Phase::Function,
                    _ => self.phase = Phase::Idle,
                },
                Phase::Matching => {
                    self.match_bytes.push(byte);
                    if self.match_bytes.len() == 8 {
                        for (i, device) in self.devices.iter().enumerate() {
                            self.active[i] = device.rom.0[..] == self.match_bytes[..];
                        }
                        self.phase = Phase::Function;
                    }
                }
                Phase::Function => {
                    match byte {
                        CONVERT_T => self.conversions += 1,
                        READ_SCRATCHPAD => {
                            let selected = self
                                .devices
                                .iter()
                                .zip(&self.active)
                                .find(|(_, active)| **active);
                            if let Some((device, _)) = selected {
                                for b in device.scratchpad {
                                    for i in 0..8 {
                                        self.read_queue.push_back((b >> i) & 1 == 1);
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                    self.phase = Phase::Idle;
                }
                Phase::Idle | Phase::Search { .. } => {}
            }
        }

        fn rom_bit(rom: &RomCode, position: usize) -> bool {
            (rom.0[position / 8] >> (position % 8)) & 1 == 1
        }
    }

    impl OneWireBus for FakeBus {
        fn reset(&mut self) -> Result<bool, OneWireError> {
            self.resets += 1;
            self.phase = Phase::RomCommand;
            self.active.iter_mut().for_each(|a| *a = true);
            self.pending_bits = 0;
            self.pending_byte = 0;
            self.read_queue.clear();
            Ok(!self.devices.is_empty())
        }

        fn write_bit(&mut self, bit: bool) -> Result<(), OneWireError> {
            if let Phase::Search { position, .. } = self.phase {
                for (i, device) in self.devices.iter().enumerate() {
                    if Self::rom_bit(&device.rom, position) != bit {
                        self.active[i] = false;
                    }
                }
                self.phase = Phase::Search {
                    position: position + 1,
                    reads: 0,
                };
                return Ok(());
            }

            if bit {
                self.pending_byte |= 1 << self.pending_bits;
            }
            self.pending_bits += 1;
            if self.pending_bits == 8 {
                let byte = self.pending_byte;
                self.pending_byte = 0;
                self.pending_bits = 0;
                self.on_byte(byte);
            }
            Ok(())
        }

        fn read_bit(&mut self) -> Result<bool, OneWireError> {
            if let Phase::Search { position, reads } = self.phase {
                // Wired-AND: any participant driving 0 wins
                let complement = reads == 1;
                let bit = self
                    .devices
                    .iter()
                    .zip(&self.active)
                    .filter(|(_, active)| **active)
                    .all(|(device, _)| Self::rom_bit(&device.rom, position) != complement);
                self.phase = Phase::Search {
                    position,
                    reads: reads + 1,
                };
                return Ok(bit);
            }
            Ok(self.read_queue.pop_front().unwrap_or(true))
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::fake::{FakeBus, FakeDevice, rom, scratchpad};
    use super::*;

    fn device(rom: RomCode) -> FakeDevice {
        FakeDevice {
            rom,
            scratchpad: scratchpad(0x0191, 0x0C, 0x10),
        }
    }

    #[test]
    fn test_crc8_check_value() {
        assert_eq!(crc8(b"123456789"), 0xA1);
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn test_crc8_appended_is_zero() {
        let data = [0x28, 0xFF, 0x4C, 0x66, 0x90, 0x15, 0x03];
        let crc = crc8(&data);
        let mut with_crc = Vec::from(data);
        with_crc.push(crc);
        assert_eq!(crc8(&with_crc), 0);
    }

    #[test]
    fn test_rom_code_validity_and_display() {
        let code = rom(0x28, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert!(code.is_valid());
        assert_eq!(code.family(), 0x28);

        let mut corrupted = code;
        corrupted.0[3] ^= 0x10;
        assert!(!corrupted.is_valid());

        let mut text = heapless::String::<32>::new();
        core::fmt::write(&mut text, format_args!("{}", code)).unwrap();
        assert!(text.starts_with("28:01:02:03:04:05:06:"));
    }

    #[test]
    fn test_search_empty_bus() {
        let mut bus = FakeBus::new(Vec::new());
        let found = search(&mut bus).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_search_single_device() {
        let only = rom(0x28, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
        let mut bus = FakeBus::new(std::vec![device(only)]);
        let found = search(&mut bus).unwrap();
        assert_eq!(found.as_slice(), &[only]);
        assert_eq!(bus.resets, 1);
    }

    #[test]
    fn test_search_finds_every_device() {
        let mut expected = std::vec![
            rom(0x28, [0x01, 0x00, 0x00, 0x00, 0x00, 0x00]),
            rom(0x28, [0x02, 0x00, 0x00, 0x00, 0x00, 0x00]),
            rom(0x10, [0x01, 0x00, 0x00, 0x00, 0x00, 0x00]),
            rom(0x22, [0x7F, 0x33, 0x00, 0x00, 0x00, 0x80]),
        ];
        let mut bus = FakeBus::new(expected.iter().copied().map(device).collect());

        let found = search(&mut bus).unwrap();
        assert_eq!(found.len(), expected.len());
        assert_eq!(bus.resets, expected.len());

        let mut found: Vec<RomCode> = found.into_iter().collect();
        found.sort();
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_search_stops_at_capacity() {
        let crowded: Vec<FakeDevice> = (0..MAX_DEVICES as u8 + 3)
            .map(|serial| device(rom(0x28, [serial, 0, 0, 0, 0, 0])))
            .collect();
        let mut bus = FakeBus::new(crowded);

        let found = search(&mut bus).unwrap();
        assert_eq!(found.len(), MAX_DEVICES);
        // The pass that found the first extra device is the last one
        assert_eq!(bus.resets, MAX_DEVICES + 1);
        assert!(found.iter().all(|code| code.is_valid() && code.family() == 0x28));
    }

    #[test]
    fn test_search_rejects_corrupted_rom() {
        let mut bad = rom(0x28, [1, 2, 3, 4, 5, 6]);
        bad.0[7] ^= 0xFF;
        let mut bus = FakeBus::new(std::vec![device(bad)]);
        assert_eq!(search(&mut bus), Err(OneWireError::CrcMismatch));
    }

    #[test]
    fn test_select_requires_presence() {
        let mut bus = FakeBus::new(Vec::new());
        let code = rom(0x28, [1, 2, 3, 4, 5, 6]);
        assert_eq!(bus.select(&code), Err(OneWireError::NoPresence));
    }
}
