//! Tests for the kernel w1 backend against a fake sysfs tree

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempserve::sensor::{
    BusError, DeviceAddress, HardwareFault, OneWireBus, SensorReading, SysfsBus,
    TemperatureSensor,
};

const GOOD_DUMP: &str =
    "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";
const BAD_CRC_DUMP: &str =
    "72 01 4b 46 7f ff 0e 10 58 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 58 t=23125\n";
const COLD_DUMP: &str =
    "5e ff 4b 46 7f ff 02 10 b6 : crc=b6 YES\n5e ff 4b 46 7f ff 02 10 b6 t=-10125\n";

/// A fake `/sys/bus/w1/devices` tree, removed again when dropped.
struct FakeDevicesDir {
    path: PathBuf,
}

impl FakeDevicesDir {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for FakeDevicesDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.path
    }
}

impl Drop for FakeDevicesDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn fake_devices_dir(test: &str) -> FakeDevicesDir {
    let path = std::env::temp_dir().join(format!("tempserve-w1-{}-{}", test, std::process::id()));
    let _ = fs::remove_dir_all(&path);
    fs::create_dir_all(&path).unwrap();
    FakeDevicesDir { path }
}

fn add_device(dir: &Path, name: &str, dump: &str) {
    let device = dir.join(name);
    fs::create_dir_all(&device).unwrap();
    fs::write(device.join("w1_slave"), dump).unwrap();
}

fn add_bus_master(dir: &Path) -> PathBuf {
    let master = dir.join("w1_bus_master1");
    fs::create_dir_all(&master).unwrap();
    let trigger = master.join("therm_bulk_read");
    fs::write(&trigger, "").unwrap();
    trigger
}

fn addr(name: &str) -> DeviceAddress {
    DeviceAddress::from_sysfs_name(name).unwrap()
}

#[tokio::test]
async fn test_scan_lists_only_thermometers() {
    let dir = fake_devices_dir("scan");
    add_bus_master(&dir);
    add_device(&dir, "28-0000075c1a2b", GOOD_DUMP);
    add_device(&dir, "10-000802b4a7c1", GOOD_DUMP);
    // DS2413 switch: present on the bus but not a thermometer
    add_device(&dir, "3a-00000012abcd", "");
    // Not a name the kernel would produce
    add_device(&dir, "28-0000075C1A2C", GOOD_DUMP);

    let mut bus = SysfsBus::new(dir.path());
    let mut found = bus.scan().await.unwrap();
    found.sort();

    assert_eq!(found, vec![addr("10-000802b4a7c1"), addr("28-0000075c1a2b")]);
}

#[tokio::test]
async fn test_scan_missing_directory_is_empty() {
    let dir = std::env::temp_dir().join("tempserve-w1-not-there");
    let mut bus = SysfsBus::new(&dir);

    assert!(bus.scan().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_start_conversion_triggers_bulk_read() {
    let dir = fake_devices_dir("trigger");
    let trigger = add_bus_master(&dir);
    add_device(&dir, "28-0000075c1a2b", GOOD_DUMP);

    let mut bus = SysfsBus::new(dir.path());
    bus.start_conversion(&addr("28-0000075c1a2b")).await.unwrap();

    assert_eq!(fs::read_to_string(trigger).unwrap(), "trigger\n");
}

#[tokio::test]
async fn test_start_conversion_without_bulk_support() {
    let dir = fake_devices_dir("nobulk");
    add_device(&dir, "28-0000075c1a2b", GOOD_DUMP);

    let mut bus = SysfsBus::new(dir.path());
    assert!(bus.start_conversion(&addr("28-0000075c1a2b")).await.is_ok());
}

#[tokio::test]
async fn test_start_conversion_unknown_device() {
    let dir = fake_devices_dir("unknown");
    let mut bus = SysfsBus::new(dir.path());

    let err = bus.start_conversion(&addr("28-0000075c1a2b")).await.unwrap_err();
    assert!(matches!(err, BusError::UnknownDevice(_)));
}

#[tokio::test]
async fn test_read_result_decodes_scratchpad() {
    let dir = fake_devices_dir("read");
    add_device(&dir, "28-0000075c1a2b", GOOD_DUMP);
    add_device(&dir, "28-0000075c1a2c", COLD_DUMP);

    let mut bus = SysfsBus::new(dir.path());
    assert_eq!(bus.read_result(&addr("28-0000075c1a2b")).await.unwrap(), 23.125);
    assert_eq!(bus.read_result(&addr("28-0000075c1a2c")).await.unwrap(), -10.125);
}

#[tokio::test]
async fn test_read_result_checks_crc_itself() {
    let dir = fake_devices_dir("crc");
    add_device(&dir, "28-0000075c1a2b", BAD_CRC_DUMP);

    let mut bus = SysfsBus::new(dir.path());
    let err = bus.read_result(&addr("28-0000075c1a2b")).await.unwrap_err();

    assert!(matches!(err, BusError::HardwareFault(HardwareFault::Checksum)));
}

#[tokio::test]
async fn test_read_result_device_vanished() {
    let dir = fake_devices_dir("vanished");
    let mut bus = SysfsBus::new(dir.path());

    let err = bus.read_result(&addr("28-0000075c1a2b")).await.unwrap_err();
    assert!(matches!(err, BusError::UnknownDevice(_)));
}

#[tokio::test]
async fn test_sensor_over_sysfs() {
    let dir = fake_devices_dir("sensor");
    add_bus_master(&dir);
    add_device(&dir, "28-0000075c1a2c", COLD_DUMP);
    add_device(&dir, "28-0000075c1a2b", GOOD_DUMP);

    let sensor = TemperatureSensor::with_settle(SysfsBus::new(dir.path()), Duration::ZERO);
    assert_eq!(sensor.read_once().await, SensorReading::Success(23.125));

    let empty = fake_devices_dir("sensor-empty");
    let sensor = TemperatureSensor::with_settle(SysfsBus::new(empty.path()), Duration::ZERO);
    assert_eq!(sensor.read_once().await, SensorReading::NoDeviceFound);

    let broken = fake_devices_dir("sensor-broken");
    add_device(&broken, "28-0000075c1a2b", BAD_CRC_DUMP);
    let sensor = TemperatureSensor::with_settle(SysfsBus::new(broken.path()), Duration::ZERO);
    assert_eq!(sensor.read_once().await, SensorReading::ReadFailed);
}

#[test]
fn test_fake_tree_is_removed_on_drop() {
    let dir = fake_devices_dir("cleanup");
    add_device(&dir, "28-0000075c1a2b", GOOD_DUMP);
    let path = dir.path().to_path_buf();
    assert!(path.join("28-0000075c1a2b").exists());

    drop(dir);
    assert!(!path.exists());
}
