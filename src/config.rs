// Timeouts, topics, serial and runtime configuration
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::control::{ControlConfig, Mode};
use crate::vision::DetectionConfig;

// Controller sampling period
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

// Grace window before the seek controller gives up on a lost color
pub const LOSS_TIMEOUT: Duration = Duration::from_secs(2);

// Pursuit controller's (much shorter) loss window
pub const PURSUIT_STOP_DELAY: Duration = Duration::from_millis(300);

// Status publish rate
pub const STATUS_HZ: u64 = 10;
const MIN_STATUS_PERIOD: Duration = Duration::from_millis(1);

// Zenoh topics
pub const TOPIC_CMD: &str = "roomba/cmd"; // commands
pub const TOPIC_STATUS: &str = "roomba/state/status"; // position + controller state

// Serial port for the Roomba SCI
pub const SERIAL_PORT: &str = "/dev/ttyUSB0";

// Manual move speed (mm/s): default and clamp range
pub const MANUAL_SPEED: i16 = 150;
pub const MANUAL_SPEED_MIN: i16 = 50;
pub const MANUAL_SPEED_MAX: i16 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything the runtime needs, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub serial_port: String,
    pub baud_rate: u32,
    pub detection: DetectionConfig,
    pub control: ControlConfig,
    /// Engage this controller right after startup
    pub autostart: Option<Mode>,
    pub status_hz: u64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            serial_port: SERIAL_PORT.to_string(),
            baud_rate: crate::motor::DEFAULT_BAUDRATE,
            detection: DetectionConfig::default(),
            control: ControlConfig::default(),
            autostart: None,
            status_hz: STATUS_HZ,
        }
    }
}

impl RobotConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Publish period, never shorter than 1 ms
    pub fn status_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.status_hz.max(1)).max(MIN_STATUS_PERIOD)
    }
}

/// Serde helper: `Duration` as integer milliseconds
pub mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
