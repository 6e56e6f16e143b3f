use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use co2mini_core::protocol::{PRODUCT_ID, VENDOR_ID};
use serde::de::{self, Deserializer};
use serde::Deserialize;

pub const ENV_PORT: &str = "CO2_EXPORTER_PORT";
pub const ENV_INTERVAL: &str = "CO2_EXPORTER_INTERVAL";
pub const ENV_RETRY_DELAY: &str = "CO2_EXPORTER_RETRY_DELAY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the metrics endpoint listens on, on all interfaces
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// USB vendor id of the sensor
    pub vendor_id: u16,
    /// USB product id of the sensor
    pub product_id: u16,
    /// Sleep between two reads, given in seconds
    #[serde(rename = "poll_interval_secs", deserialize_with = "deserialize_secs")]
    pub poll_interval: Duration,
    /// Wait before reconnecting after any failure, given in seconds
    #[serde(rename = "retry_delay_secs", deserialize_with = "deserialize_secs")]
    pub retry_delay: Duration,
    /// Upper bound on a single blocking read, given in milliseconds
    #[serde(rename = "read_timeout_ms", deserialize_with = "deserialize_millis")]
    pub read_timeout: Duration,
}

/// Longest read timeout the HID layer accepts, in milliseconds.
pub const MAX_READ_TIMEOUT_MS: u64 = i32::MAX as u64;

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overrides values from the `CO2_EXPORTER_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PORT) {
            self.server.port = match value.trim().parse() {
                Ok(port) => port,
                Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_PORT,
                        value,
                    });
                }
            };
        }

        if let Some(value) = lookup(ENV_INTERVAL) {
            self.monitor.poll_interval = parse_secs(ENV_INTERVAL, value)?;
        }

        if let Some(value) = lookup(ENV_RETRY_DELAY) {
            self.monitor.retry_delay = parse_secs(ENV_RETRY_DELAY, value)?;
        }

        Ok(())
    }
}

/// Seconds as a duration. Negative, non-finite and out of range values are rejected.
fn secs_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

fn parse_secs(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<f64>().ok().and_then(secs_to_duration) {
        Some(duration) => Ok(duration),
        None => Err(ConfigError::InvalidValue { key, value }),
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    secs_to_duration(secs)
        .ok_or_else(|| de::Error::custom(format!("invalid duration: {secs} seconds")))
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    if millis > MAX_READ_TIMEOUT_MS {
        return Err(de::Error::custom(format!(
            "read timeout {millis} ms exceeds {MAX_READ_TIMEOUT_MS} ms"
        )));
    }
    Ok(Duration::from_millis(millis))
}

impl ServerConfig {
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 4446 }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            poll_interval: Duration::from_secs(2),
            retry_delay: Duration::from_secs(5),
            read_timeout: Duration::from_millis(1000),
        }
    }
}
