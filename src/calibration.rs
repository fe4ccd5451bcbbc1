//! Sensor calibration and board-mount frame transform.
//!
//! Correction order for every sample:
//!
//! 1. rotate sensor axes into the board frame ([`MountOrientation`]),
//! 2. subtract offsets / apply scale factors ([`Calibration`]).
//!
//! Calibration is therefore expressed in the board frame, so a residual
//! bias measured on a running driver can be added straight back in.

use log::info;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ImuError;
use crate::sensors::Imu;

/// Offsets and scale factors, stored as plain arrays so the struct
/// serialises without extra crate features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// rad/s, subtracted.
    pub gyro_bias: [f32; 3],
    /// m/s², subtracted before scaling.
    pub accel_offset: [f32; 3],
    pub accel_scale: [f32; 3],
    /// Hard-iron offset, µT, subtracted.
    pub mag_offset: [f32; 3],
    /// Soft-iron matrix, row-major.
    pub mag_scale: [[f32; 3]; 3],
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            gyro_bias: [0.0; 3],
            accel_offset: [0.0; 3],
            accel_scale: [1.0; 3],
            mag_offset: [0.0; 3],
            mag_scale: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

impl Calibration {
    pub fn is_finite(&self) -> bool {
        self.gyro_bias
            .iter()
            .chain(&self.accel_offset)
            .chain(&self.accel_scale)
            .chain(&self.mag_offset)
            .chain(self.mag_scale.iter().flatten())
            .all(|v| v.is_finite())
    }

    /// Fold a residual gyro bias (measured on corrected output) into the
    /// stored bias.
    pub fn add_gyro_bias(&mut self, residual: [f32; 3]) {
        for (bias, r) in self.gyro_bias.iter_mut().zip(residual) {
            *bias += r;
        }
    }
}

/// How the IMU is mounted relative to the board frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MountOrientation {
    #[default]
    Identity,
    /// Rotated 90° about Z.
    Yaw90,
    Yaw180,
    Yaw270,
    /// Upside down, rotated about X.
    Roll180,
    /// Upside down, rotated about Y.
    Pitch180,
}

impl MountOrientation {
    /// Sensor-to-board rotation.
    pub fn rotation(self) -> Matrix3<f32> {
        match self {
            Self::Identity => Matrix3::identity(),
            Self::Yaw90 => Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            Self::Yaw180 => Matrix3::new(-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0),
            Self::Yaw270 => Matrix3::new(0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            Self::Roll180 => Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0),
            Self::Pitch180 => Matrix3::new(-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0),
        }
    }
}

/// Precomputed correction applied by the hardware drivers.
#[derive(Debug, Clone)]
pub struct Corrector {
    rotation: Matrix3<f32>,
    gyro_bias: Vector3<f32>,
    accel_offset: Vector3<f32>,
    accel_scale: Vector3<f32>,
    mag_offset: Vector3<f32>,
    mag_scale: Matrix3<f32>,
}

impl Corrector {
    pub fn new(calibration: &Calibration, mount: MountOrientation) -> Self {
        let m = calibration.mag_scale;
        Self {
            rotation: mount.rotation(),
            gyro_bias: Vector3::from(calibration.gyro_bias),
            accel_offset: Vector3::from(calibration.accel_offset),
            accel_scale: Vector3::from(calibration.accel_scale),
            mag_offset: Vector3::from(calibration.mag_offset),
            mag_scale: Matrix3::new(
                m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
            ),
        }
    }

    pub fn apply(
        &self,
        accel: Vector3<f32>,
        gyro: Vector3<f32>,
        mag: Option<Vector3<f32>>,
    ) -> (Vector3<f32>, Vector3<f32>, Option<Vector3<f32>>) {
        let accel = (self.rotation * accel - self.accel_offset).component_mul(&self.accel_scale);
        let gyro = self.rotation * gyro - self.gyro_bias;
        let mag = mag.map(|m| self.mag_scale * (self.rotation * m - self.mag_offset));
        (accel, gyro, mag)
    }
}

/// Average `samples` gyro readings from a stationary board.
///
/// The result is the residual bias of the driver's current output; pass it
/// to [`Calibration::add_gyro_bias`].  Failed reads are skipped, but the
/// call gives up with the last error if no read succeeds.
pub fn estimate_gyro_bias<I: Imu>(imu: &mut I, samples: u16) -> Result<[f32; 3], ImuError> {
    let mut sum = Vector3::<f32>::zeros();
    let mut good: u16 = 0;
    let mut last_err = ImuError::NotInitialized;

    for _ in 0..samples {
        match imu.read() {
            Ok(s) => {
                sum += s.gyro;
                good += 1;
            }
            Err(e) => last_err = e,
        }
    }

    if good == 0 {
        return Err(last_err);
    }
    let mean = sum / f32::from(good);
    info!(
        "gyro bias from {}/{} samples: [{:.5}, {:.5}, {:.5}] rad/s",
        good, samples, mean.x, mean.y, mean.z
    );
    Ok([mean.x, mean.y, mean.z])
}
