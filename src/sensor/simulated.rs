//! Hardware-less bus backend
//!
//! Used on hosts without a 1-Wire adapter and by tests that need a bus
//! with predictable behaviour.

use crate::sensor::onewire::{BusError, DeviceAddress, HardwareFault, OneWireBus};

/// In-memory bus that reports a fixed temperature for every attached device.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    devices: Vec<DeviceAddress>,
    celsius: f64,
    fault: Option<HardwareFault>,
    converting: Option<DeviceAddress>,
}

impl SimulatedBus {
    /// Creates a bus with the given devices, each reporting `celsius`.
    pub fn new(devices: Vec<DeviceAddress>, celsius: f64) -> Self {
        Self {
            devices,
            celsius,
            fault: None,
            converting: None,
        }
    }

    /// A bus with nothing attached.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0.0)
    }

    /// Makes every subsequent `read_result` fail with `fault`.
    pub fn with_fault(mut self, fault: HardwareFault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn set_celsius(&mut self, celsius: f64) {
        self.celsius = celsius;
    }
}

impl OneWireBus for SimulatedBus {
    async fn scan(&mut self) -> Result<Vec<DeviceAddress>, BusError> {
        Ok(self.devices.clone())
    }

    async fn start_conversion(&mut self, device: &DeviceAddress) -> Result<(), BusError> {
        if !self.devices.contains(device) {
            return Err(BusError::UnknownDevice(*device));
        }
        self.converting = Some(*device);
        Ok(())
    }

    async fn read_result(&mut self, device: &DeviceAddress) -> Result<f64, BusError> {
        if !self.devices.contains(device) {
            return Err(BusError::UnknownDevice(*device));
        }
        if let Some(fault) = self.fault {
            return Err(fault.into());
        }
        // Reading without a prior conversion returns the power-on register value.
        if self.converting.take() != Some(*device) {
            return Ok(85.0);
        }
        Ok(self.celsius)
    }
}
