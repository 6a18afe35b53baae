use std::path::{Path, PathBuf};
use std::time::Duration;

use tempserve::config::{CONFIG_ENV, Config, ConfigError, LISTEN_ENV, SensorBackend};

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tempserve-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:80");
    assert_eq!(cfg.server.backlog, 5);
    assert_eq!(cfg.server.request_buffer_size, 1024);
    assert_eq!(cfg.sensor.backend, SensorBackend::Sysfs);
    assert_eq!(cfg.sensor.devices_dir, Path::new("/sys/bus/w1/devices"));
    assert_eq!(cfg.sensor.settle(), Duration::from_millis(750));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str("server:\n  listen_addr: \"127.0.0.1:8080\"\n").unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.backlog, 5);
    assert_eq!(cfg.sensor, Config::default().sensor);
}

#[test]
fn test_config_full_yaml() {
    let yaml = r#"
server:
  listen_addr: "0.0.0.0:8080"
  backlog: 16
  request_buffer_size: 2048
  read_timeout_ms: 250
sensor:
  backend: simulated
  devices_dir: /tmp/w1
  settle_ms: 200
  resolution_bits: 10
  simulated_celsius: -4.5
"#;
    let cfg = Config::from_yaml_str(yaml).unwrap();

    assert_eq!(cfg.server.backlog, 16);
    assert_eq!(cfg.server.limits().buffer_size, 2048);
    assert_eq!(cfg.server.limits().read_timeout, Duration::from_millis(250));
    assert_eq!(cfg.sensor.backend, SensorBackend::Simulated);
    assert_eq!(cfg.sensor.devices_dir, Path::new("/tmp/w1"));
    assert_eq!(cfg.sensor.simulated_celsius, -4.5);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_empty_yaml_is_default() {
    assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    assert_eq!(Config::from_yaml_str("  \n").unwrap(), Config::default());
}

#[test]
fn test_config_rejects_unknown_fields() {
    assert!(Config::from_yaml_str("server:\n  listen: \"0.0.0.0:80\"\n").is_err());
    assert!(Config::from_yaml_str("sensor:\n  backend: spi\n").is_err());
}

#[test]
fn test_config_listen_override() {
    let cfg = Config::default().with_listen_override(Some("127.0.0.1:8000".to_string()));
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8000");

    let cfg = Config::default().with_listen_override(Some("  ".to_string()));
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:80");

    let cfg = Config::default().with_listen_override(None);
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:80");
}

#[test]
fn test_config_settle_must_cover_conversion_time() {
    let mut cfg = Config::default();
    cfg.sensor.settle_ms = 500;
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

    cfg.sensor.resolution_bits = 11;
    assert!(cfg.validate().is_ok());

    cfg.sensor.resolution_bits = 9;
    cfg.sensor.settle_ms = 94;
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_rejects_bad_values() {
    let mut cfg = Config::default();
    cfg.sensor.resolution_bits = 8;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.server.backlog = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.server.request_buffer_size = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_rejects_non_finite_simulated_value() {
    for value in [".nan", ".inf", "-.inf"] {
        let yaml = format!("sensor:\n  backend: simulated\n  simulated_celsius: {}\n", value);
        let cfg = Config::from_yaml_str(&yaml).unwrap();
        assert!(cfg.validate().is_err(), "{}", value);
    }
}

#[test]
fn test_config_load_from_missing_file_is_default() {
    let path = std::env::temp_dir().join("tempserve-does-not-exist.yaml");
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_config_load_from_invalid_file() {
    let path = scratch_file("broken.yaml", "server: [not, a, map]\n");
    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_config_load_from_environment() {
    let path = scratch_file(
        "env.yaml",
        "server:\n  listen_addr: \"127.0.0.1:9000\"\nsensor:\n  backend: simulated\n",
    );

    unsafe {
        std::env::set_var(CONFIG_ENV, &path);
        std::env::remove_var(LISTEN_ENV);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.sensor.backend, SensorBackend::Simulated);

    unsafe {
        std::env::set_var(LISTEN_ENV, "0.0.0.0:3000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");

    unsafe {
        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var(LISTEN_ENV);
    }
}
