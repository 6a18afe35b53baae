//! Temperature sensing
//!
//! `TemperatureSensor` drives a [`OneWireBus`] through the DS18x20
//! scan / convert / settle / read sequence and condenses the outcome into a
//! [`SensorReading`]. Hardware problems never escape as errors; they become
//! reading variants the HTTP layer turns into a 503.

pub mod onewire;
pub mod simulated;
pub mod sysfs;

use std::time::Duration;

use tokio::sync::Mutex;

pub use onewire::{BusError, DeviceAddress, HardwareFault, OneWireBus};
pub use simulated::SimulatedBus;
pub use sysfs::SysfsBus;

/// Default conversion settle window (DS18B20 at 12-bit resolution)
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(750);

/// Worst-case DS18x20 conversion time for a given resolution.
///
/// Returns `None` for resolutions the family does not support.
pub fn conversion_time(resolution_bits: u8) -> Option<Duration> {
    let ms = match resolution_bits {
        9 => 94,
        10 => 188,
        11 => 375,
        12 => 750,
        _ => return None,
    };
    Some(Duration::from_millis(ms))
}

/// Why a reading carries no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bus scan found no thermometer
    NoDeviceFound,
    /// A thermometer was found but conversion or read-back failed
    ReadFailed,
}

/// Outcome of a single sensor read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    Success(f64),
    NoDeviceFound,
    ReadFailed,
}

impl SensorReading {
    /// Whether a device answered the scan.
    pub fn present(&self) -> bool {
        !matches!(self, SensorReading::NoDeviceFound)
    }

    pub fn raw_value(&self) -> Option<f64> {
        match self {
            SensorReading::Success(value) => Some(*value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            SensorReading::Success(_) => None,
            SensorReading::NoDeviceFound => Some(ErrorKind::NoDeviceFound),
            SensorReading::ReadFailed => Some(ErrorKind::ReadFailed),
        }
    }
}

/// A DS18x20 thermometer reached through a 1-Wire bus.
///
/// The bus is not reentrant, so it sits behind an async mutex and readings
/// are serialized even when callers run concurrently.
pub struct TemperatureSensor<B> {
    bus: Mutex<B>,
    settle: Duration,
}

impl<B: OneWireBus> TemperatureSensor<B> {
    pub fn new(bus: B) -> Self {
        Self::with_settle(bus, DEFAULT_SETTLE)
    }

    pub fn with_settle(bus: B, settle: Duration) -> Self {
        Self {
            bus: Mutex::new(bus),
            settle,
        }
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Performs one scan / convert / read cycle.
    ///
    /// The device is rescanned every time since thermometers may be
    /// hot-plugged. When several are present the lowest address wins.
    pub async fn read_once(&self) -> SensorReading {
        let mut bus = self.bus.lock().await;

        let devices = match bus.scan().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "1-Wire scan failed");
                return SensorReading::NoDeviceFound;
            }
        };

        let Some(device) = devices.into_iter().min() else {
            tracing::warn!("No DS18x20 devices found");
            return SensorReading::NoDeviceFound;
        };

        if let Err(e) = bus.start_conversion(&device).await {
            tracing::error!(device = %device, error = %e, "Failed to start conversion");
            return SensorReading::ReadFailed;
        }

        tokio::time::sleep(self.settle).await;

        match bus.read_result(&device).await {
            Ok(celsius) if celsius.is_finite() => {
                tracing::debug!(device = %device, celsius, "Temperature read");
                SensorReading::Success(celsius)
            }
            Ok(celsius) => {
                tracing::error!(device = %device, celsius, "Sensor returned a non-finite value");
                SensorReading::ReadFailed
            }
            Err(e) => {
                tracing::error!(device = %device, error = %e, "Error reading temperature");
                SensorReading::ReadFailed
            }
        }
    }
}
