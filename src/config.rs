// Bus location, peripheral address, calibration and teleop defaults
use serde::Deserialize;
use std::path::Path;

// I2C bus the ThunderBorg is wired to (Raspberry Pi header pins 3/5)
pub const I2C_BUS: &str = "/dev/i2c-1";

// Fixed 7-bit address of the board, also reported back by the GET_ID reply
pub const I2C_ADDRESS: u8 = 0x15;

// Seconds needed to drive about one meter at full allowed power
pub const DEFAULT_SECONDS_PER_METER: f64 = 5.7;

// Seconds needed for one full in-place spin
pub const DEFAULT_SECONDS_PER_SPIN: f64 = 4.8;

// Teleop step sizes (one key press = one timed move)
pub const TELEOP_STEP_CM: u32 = 10;
pub const TELEOP_STEP_DEG: f32 = 10.0;

/// Error types for loading a calibration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse calibration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid calibration value for {field}: {value}")]
    Invalid { field: &'static str, value: f64 },
}

/// Open-loop timing constants for one physical robot.
///
/// These depend on motor wear, battery level and floor surface, so they are
/// meant to be measured and tuned per robot. A calibration file is plain JSON:
///
/// ```json
/// { "seconds_per_meter": 5.2, "seconds_per_spin": 4.5 }
/// ```
///
/// Missing fields keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub seconds_per_meter: f64,
    pub seconds_per_spin: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            seconds_per_meter: DEFAULT_SECONDS_PER_METER,
            seconds_per_spin: DEFAULT_SECONDS_PER_SPIN,
        }
    }
}

impl Calibration {
    /// Load a calibration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse and validate a calibration from a JSON string
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let calibration: Calibration = serde_json::from_str(raw)?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Both constants must be positive, finite durations
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("seconds_per_meter", self.seconds_per_meter),
            ("seconds_per_spin", self.seconds_per_spin),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid { field, value });
            }
        }
        Ok(())
    }
}
