//! IMU configuration parameters.
//!
//! All tunable parameters for the IMU subsystem.  Values can be overridden
//! from a JSON document or a postcard blob persisted in NVS; both paths
//! validate before the config is accepted.

use serde::{Deserialize, Serialize};

use crate::calibration::{Calibration, MountOrientation};
use crate::error::ConfigError;
use crate::pins;
use crate::select::{BUILD_FLAGS, DriverFlags};
use crate::sensors::invensense::{AccelRange, Dlpf, GyroRange};

/// Lowest output rate the divider can produce with the DLPF on.
pub const MIN_SAMPLE_RATE_HZ: u16 = 4;
/// Internal sample rate with the DLPF on.
pub const MAX_SAMPLE_RATE_HZ: u16 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuConfig {
    // --- Startup-time driver selection ---
    /// Driver flags for runtime selection.  Defaults to the build flags.
    pub drivers: DriverFlags,

    // --- Bus ---
    /// 7-bit address of the accel/gyro die (AD0 strap).
    pub i2c_address: u8,

    // --- Acquisition ---
    /// Output data rate (Hz).
    pub sample_rate_hz: u16,
    pub gyro_range: GyroRange,
    pub accel_range: AccelRange,
    pub dlpf: Dlpf,
    /// Bring up the companion magnetometer.
    pub mag_enabled: bool,

    // --- Frame & calibration ---
    pub mount: MountOrientation,
    pub calibration: Calibration,

    // --- Fault detection ---
    /// Consecutive failed reads before the driver reports a fault.
    pub fault_threshold: u8,
    /// Identical raw frames tolerated before reporting stuck output
    /// (0 disables the check).
    pub stuck_threshold: u16,

    // --- Telemetry ---
    /// Good samples per telemetry log line.
    pub telemetry_every: u32,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            drivers: BUILD_FLAGS,
            i2c_address: pins::IMU_ADDR_AD0_LOW,
            sample_rate_hz: 100,
            gyro_range: GyroRange::default(),
            accel_range: AccelRange::default(),
            dlpf: Dlpf::default(),
            mag_enabled: true,
            mount: MountOrientation::default(),
            calibration: Calibration::default(),
            fault_threshold: 3,
            stuck_threshold: 50, // 0.5 s at 100 Hz
            telemetry_every: 100, // 1/s at 100 Hz
        }
    }
}

impl ImuConfig {
    /// Reject out-of-range values.  Never clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.i2c_address != pins::IMU_ADDR_AD0_LOW && self.i2c_address != pins::IMU_ADDR_AD0_HIGH {
            return Err(ConfigError::ValidationFailed("i2c_address must be 0x68 or 0x69"));
        }
        if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&self.sample_rate_hz) {
            return Err(ConfigError::ValidationFailed("sample_rate_hz must be 4..=1000"));
        }
        if self.fault_threshold == 0 {
            return Err(ConfigError::ValidationFailed("fault_threshold must be non-zero"));
        }
        if self.telemetry_every == 0 {
            return Err(ConfigError::ValidationFailed("telemetry_every must be non-zero"));
        }
        if !self.calibration.is_finite() {
            return Err(ConfigError::ValidationFailed("calibration contains non-finite values"));
        }
        if self.calibration.accel_scale.iter().any(|s| *s <= 0.0) {
            return Err(ConfigError::ValidationFailed("accel_scale must be positive"));
        }
        Ok(())
    }

    /// Sample period in milliseconds (rounded down, at least 1).
    pub fn sample_period_ms(&self) -> u32 {
        (1000 / u32::from(self.sample_rate_hz.max(1))).max(1)
    }

    /// Parse and validate a JSON document.  Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(|_| ConfigError::Encode)
    }

    /// Encode as a compact NVS blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encode)
    }

    /// Decode and validate an NVS blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}
