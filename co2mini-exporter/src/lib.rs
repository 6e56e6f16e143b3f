pub mod config;
pub mod device;
pub mod metrics;
pub mod monitor;
pub mod server;

pub use config::{Config, ConfigError, MonitorConfig, ServerConfig};
pub use device::hid::HidApiTransport;
pub use device::mock::MockTransport;
pub use device::{DeviceSession, HidHandle, HidTransport, SessionError};
pub use metrics::{MetricsError, MetricsRegistry};
pub use monitor::{MonitorLoop, MonitorState};
