use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::http::connection::ConnectionLimits;
use crate::sensor::conversion_time;
use crate::sensor::sysfs::DEFAULT_DEVICES_DIR;

/// Environment variable naming the YAML config file
pub const CONFIG_ENV: &str = "TEMPSERVE_CONFIG";
/// Environment variable overriding `server.listen_addr`
pub const LISTEN_ENV: &str = "LISTEN";
pub const DEFAULT_CONFIG_PATH: &str = "tempserve.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub sensor: SensorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Pending-connection queue length passed to `listen(2)`
    pub backlog: u32,
    /// Most bytes read from a client before the request line is parsed
    pub request_buffer_size: usize,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorBackend {
    /// Kernel w1 driver under `devices_dir`
    Sysfs,
    /// No hardware; reports `simulated_celsius` from one fake device
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    pub backend: SensorBackend,
    pub devices_dir: PathBuf,
    pub settle_ms: u64,
    pub resolution_bits: u8,
    pub simulated_celsius: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:80".to_string(),
            backlog: 5,
            request_buffer_size: 1024,
            read_timeout_ms: 5000,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            backend: SensorBackend::Sysfs,
            devices_dir: PathBuf::from(DEFAULT_DEVICES_DIR),
            settle_ms: 750,
            resolution_bits: 12,
            simulated_celsius: 21.5,
        }
    }
}

impl ServerConfig {
    pub fn limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            buffer_size: self.request_buffer_size,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

impl SensorConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Config {
    /// Loads the file named by `TEMPSERVE_CONFIG` (or `tempserve.yaml`),
    /// applies the `LISTEN` override and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let cfg = Self::load_from(Path::new(&path))?
            .with_listen_override(std::env::var(LISTEN_ENV).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads a YAML config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Self::from_yaml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn with_listen_override(mut self, listen_addr: Option<String>) -> Self {
        if let Some(addr) = listen_addr.filter(|a| !a.trim().is_empty()) {
            self.server.listen_addr = addr;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.listen_addr is empty".to_string()));
        }
        if self.server.backlog == 0 {
            return Err(ConfigError::Invalid("server.backlog must be positive".to_string()));
        }
        if self.server.request_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "server.request_buffer_size must be positive".to_string(),
            ));
        }
        if self.server.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.read_timeout_ms must be positive".to_string(),
            ));
        }

        if !self.sensor.simulated_celsius.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "sensor.simulated_celsius must be finite, got {}",
                self.sensor.simulated_celsius
            )));
        }

        let worst_case = conversion_time(self.sensor.resolution_bits).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "sensor.resolution_bits must be 9..=12, got {}",
                self.sensor.resolution_bits
            ))
        })?;
        if self.sensor.settle() < worst_case {
            return Err(ConfigError::Invalid(format!(
                "sensor.settle_ms {} is shorter than the {} ms conversion time at {}-bit resolution",
                self.sensor.settle_ms,
                worst_case.as_millis(),
                self.sensor.resolution_bits
            )));
        }

        Ok(())
    }
}
