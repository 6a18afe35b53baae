//! Kernel w1 backend
//!
//! Talks to DS18x20 thermometers through the Linux `w1_therm` driver, which
//! exposes every device as a directory under `/sys/bus/w1/devices`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::sensor::onewire::{
    BusError, DeviceAddress, HardwareFault, OneWireBus, SCRATCHPAD_LEN, decode_scratchpad,
    is_supported_family,
};

/// Default location of the w1 device tree
pub const DEFAULT_DEVICES_DIR: &str = "/sys/bus/w1/devices";

const BUS_MASTER_PREFIX: &str = "w1_bus_master";
const BULK_READ_FILE: &str = "therm_bulk_read";
const SLAVE_FILE: &str = "w1_slave";

/// 1-Wire bus backed by the kernel's sysfs interface.
#[derive(Debug, Clone)]
pub struct SysfsBus {
    devices_dir: PathBuf,
}

impl SysfsBus {
    pub fn new(devices_dir: impl Into<PathBuf>) -> Self {
        Self {
            devices_dir: devices_dir.into(),
        }
    }

    pub fn devices_dir(&self) -> &Path {
        &self.devices_dir
    }

    fn device_dir(&self, device: &DeviceAddress) -> PathBuf {
        self.devices_dir.join(device.sysfs_name())
    }

    /// Finds the bus master's bulk conversion trigger, if the driver offers one.
    async fn bulk_read_trigger(&self) -> Result<Option<PathBuf>, BusError> {
        let mut entries = fs::read_dir(&self.devices_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(BUS_MASTER_PREFIX) {
                continue;
            }
            let trigger = entry.path().join(BULK_READ_FILE);
            if fs::try_exists(&trigger).await? {
                return Ok(Some(trigger));
            }
        }
        Ok(None)
    }
}

impl OneWireBus for SysfsBus {
    async fn scan(&mut self) -> Result<Vec<DeviceAddress>, BusError> {
        let mut entries = match fs::read_dir(&self.devices_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    dir = %self.devices_dir.display(),
                    "w1 device directory missing, is the w1_therm driver loaded?"
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut devices = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(address) = name.to_str().and_then(DeviceAddress::from_sysfs_name) else {
                continue;
            };
            if is_supported_family(address.family()) {
                devices.push(address);
            }
        }

        tracing::trace!(count = devices.len(), "w1 scan complete");
        Ok(devices)
    }

    async fn start_conversion(&mut self, device: &DeviceAddress) -> Result<(), BusError> {
        if !fs::try_exists(self.device_dir(device)).await? {
            return Err(BusError::UnknownDevice(*device));
        }

        match self.bulk_read_trigger().await? {
            Some(trigger) => {
                fs::write(&trigger, b"trigger\n").await?;
                tracing::trace!(device = %device, "bulk conversion triggered");
            }
            None => {
                tracing::debug!(device = %device, "no bulk read support, driver converts on read");
            }
        }
        Ok(())
    }

    async fn read_result(&mut self, device: &DeviceAddress) -> Result<f64, BusError> {
        let path = self.device_dir(device).join(SLAVE_FILE);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BusError::UnknownDevice(*device));
            }
            Err(e) => return Err(e.into()),
        };

        let scratchpad = parse_w1_slave(&contents)?;
        decode_scratchpad(device.family(), &scratchpad)
    }
}

/// Extracts the scratchpad from a `w1_slave` dump.
///
/// The first line looks like `72 01 4b 46 7f ff 0e 10 57 : crc=57 YES`.
pub fn parse_w1_slave(contents: &str) -> Result<[u8; SCRATCHPAD_LEN], BusError> {
    let first_line = contents
        .lines()
        .next()
        .ok_or(HardwareFault::NoResponse)?;

    let (hex, verdict) = first_line
        .split_once(':')
        .ok_or_else(|| BusError::Parse(format!("unexpected w1_slave line: {}", first_line)))?;

    let mut scratchpad = [0u8; SCRATCHPAD_LEN];
    let mut count = 0;
    for token in hex.split_whitespace() {
        if count == SCRATCHPAD_LEN {
            return Err(BusError::Parse("scratchpad longer than 9 bytes".to_string()));
        }
        scratchpad[count] = u8::from_str_radix(token, 16)
            .map_err(|_| BusError::Parse(format!("bad scratchpad byte: {}", token)))?;
        count += 1;
    }
    if count != SCRATCHPAD_LEN {
        return Err(BusError::Parse(format!("scratchpad has {} bytes", count)));
    }

    if !verdict.trim_end().ends_with("YES") {
        return Err(HardwareFault::Checksum.into());
    }

    Ok(scratchpad)
}
