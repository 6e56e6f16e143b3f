use co2mini_core::Reading;
use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};
use tracing::debug;

pub const CO2_METRIC: &str = "co2mini_co2_ppm";
pub const TEMPERATURE_METRIC: &str = "co2mini_temperature_celsius";

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metrics output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Gauges published by the exporter.
///
/// Each gauge only holds the last value set. Clones share the same gauges.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    co2_ppm: IntGauge,
    temperature_celsius: Gauge,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let co2_ppm = IntGauge::new(CO2_METRIC, "CO2 concentration in ppm")?;
        let temperature_celsius = Gauge::new(TEMPERATURE_METRIC, "Temperature in Celsius")?;

        registry.register(Box::new(co2_ppm.clone()))?;
        registry.register(Box::new(temperature_celsius.clone()))?;

        Ok(Self {
            registry,
            co2_ppm,
            temperature_celsius,
        })
    }

    /// Set the gauge matching a reading.
    pub fn publish(&self, reading: &Reading) {
        match *reading {
            Reading::Co2(ppm) => self.set(CO2_METRIC, f64::from(ppm)),
            Reading::Temperature(celsius) => self.set(TEMPERATURE_METRIC, celsius),
        };
    }

    /// Set a gauge by name. Returns false if no gauge has that name.
    pub fn set(&self, name: &str, value: f64) -> bool {
        match name {
            CO2_METRIC => self.co2_ppm.set(value.round() as i64),
            TEMPERATURE_METRIC => self.temperature_celsius.set(value),
            _ => {
                debug!(name, "Ignoring unknown metric");
                return false;
            }
        }
        true
    }

    pub fn co2_ppm(&self) -> i64 {
        self.co2_ppm.get()
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.temperature_celsius.get()
    }

    /// Render all gauges in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}
