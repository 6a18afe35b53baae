//! 1-Wire bus abstraction
//!
//! This module defines the contract every bus backend implements, the ROM
//! address type, and the DS18x20 scratchpad decoding shared by the backends.

use std::fmt;

use thiserror::Error;

/// DS18S20 family code (9-bit, extended via count registers)
pub const FAMILY_DS18S20: u8 = 0x10;
/// DS1822 family code
pub const FAMILY_DS1822: u8 = 0x22;
/// DS18B20 family code
pub const FAMILY_DS18B20: u8 = 0x28;

/// Scratchpad length for the DS18x20 family, including the CRC byte
pub const SCRATCHPAD_LEN: usize = 9;

/// Returns true when the family code belongs to a supported thermometer.
pub fn is_supported_family(family: u8) -> bool {
    matches!(family, FAMILY_DS18S20 | FAMILY_DS1822 | FAMILY_DS18B20)
}

/// Faults reported by the device itself.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HardwareFault {
    /// Scratchpad CRC did not match its payload
    #[error("scratchpad checksum mismatch")]
    Checksum,
    /// The bus returned idle or pulled-down data
    #[error("device did not respond")]
    NoResponse,
}

/// Errors surfaced by a bus backend.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hardware fault: {0}")]
    HardwareFault(#[from] HardwareFault),

    #[error("device {0} is not on the bus")]
    UnknownDevice(DeviceAddress),

    #[error("malformed device data: {0}")]
    Parse(String),
}

/// 64-bit ROM code of a 1-Wire device.
///
/// Byte 0 is the family code, bytes 1..7 the 48-bit serial number (least
/// significant byte first) and byte 7 the CRC-8 of the first seven bytes.
/// Ordering is lexicographic over these bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress([u8; 8]);

impl DeviceAddress {
    /// Builds an address from a family code and a 48-bit serial, filling in the CRC.
    pub fn new(family: u8, serial: u64) -> Self {
        let mut rom = [0u8; 8];
        rom[0] = family;
        rom[1..7].copy_from_slice(&serial.to_le_bytes()[..6]);
        rom[7] = crc8(&rom[..7]);
        Self(rom)
    }

    /// Wraps a raw ROM code as read from the bus.
    pub fn from_bytes(rom: [u8; 8]) -> Self {
        Self(rom)
    }

    pub fn bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn family(&self) -> u8 {
        self.0[0]
    }

    pub fn serial(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf[..6].copy_from_slice(&self.0[1..7]);
        u64::from_le_bytes(buf)
    }

    /// Checks the trailing CRC byte against the rest of the ROM code.
    pub fn is_crc_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.0[7]
    }

    /// Parses the kernel w1 device name, e.g. `28-0000075c1a2b`.
    ///
    /// The kernel prints the serial most significant byte first, in
    /// lowercase hex. Anything else would not format back to the same name.
    pub fn from_sysfs_name(name: &str) -> Option<Self> {
        let (family, serial) = name.split_once('-')?;
        if family.len() != 2 || serial.len() != 12 {
            return None;
        }
        let is_lower_hex = |c: char| matches!(c, '0'..='9' | 'a'..='f');
        if !family.chars().chain(serial.chars()).all(is_lower_hex) {
            return None;
        }
        let family = u8::from_str_radix(family, 16).ok()?;
        let serial = u64::from_str_radix(serial, 16).ok()?;
        Some(Self::new(family, serial))
    }

    /// Formats the address the way the kernel w1 subsystem names devices.
    pub fn sysfs_name(&self) -> String {
        format!("{:02x}-{:012x}", self.family(), self.serial())
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sysfs_name())
    }
}

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected).
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

/// Validates a scratchpad and converts its temperature registers to °C.
pub fn decode_scratchpad(family: u8, scratchpad: &[u8; SCRATCHPAD_LEN]) -> Result<f64, BusError> {
    // An idle bus reads as all ones, a shorted one as all zeros; both pass the CRC check.
    if scratchpad.iter().all(|&b| b == 0x00) || scratchpad.iter().all(|&b| b == 0xFF) {
        return Err(HardwareFault::NoResponse.into());
    }
    if crc8(&scratchpad[..8]) != scratchpad[8] {
        return Err(HardwareFault::Checksum.into());
    }

    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    match family {
        FAMILY_DS18S20 => {
            let count_remain = f64::from(scratchpad[6]);
            let count_per_c = f64::from(scratchpad[7]);
            if count_per_c == 0.0 {
                return Err(HardwareFault::NoResponse.into());
            }
            let whole = f64::from(raw >> 1);
            Ok(whole - 0.25 + (count_per_c - count_remain) / count_per_c)
        }
        FAMILY_DS1822 | FAMILY_DS18B20 => Ok(f64::from(raw) / 16.0),
        other => Err(BusError::Parse(format!("unsupported family 0x{:02x}", other))),
    }
}

/// Operations a 1-Wire bus master offers to the temperature sensor.
///
/// `start_conversion` must complete, and the conversion time must elapse,
/// before `read_result` returns a meaningful value.
pub trait OneWireBus: Send {
    /// Discovers the thermometers currently attached to the bus.
    fn scan(&mut self) -> impl Future<Output = Result<Vec<DeviceAddress>, BusError>> + Send;

    /// Issues a temperature conversion on the given device.
    fn start_conversion(
        &mut self,
        device: &DeviceAddress,
    ) -> impl Future<Output = Result<(), BusError>> + Send;

    /// Reads back the converted temperature in °C.
    fn read_result(
        &mut self,
        device: &DeviceAddress,
    ) -> impl Future<Output = Result<f64, BusError>> + Send;
}
