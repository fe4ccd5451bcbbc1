//! IMU drivers and the capability interface they share.
//!
//! Every driver (real or simulated) implements [`Imu`], so the rest of the
//! firmware can hold whichever one [`crate::select`] resolved without
//! caring which chip is fitted.  Construction goes through [`ImuDriver`],
//! which gives every driver the same `attach(bus, config)` call site.

pub mod ak89xx;
pub mod fake;
pub mod health;
pub mod invensense;
pub mod mpu9150;
pub mod mpu9250;

use embedded_hal::delay::DelayNs;
use nalgebra::Vector3;

use crate::config::ImuConfig;
use crate::error::ImuError;
use crate::select::DriverKind;

pub use fake::FakeImu;
pub use mpu9150::Mpu9150;
pub use mpu9250::Mpu9250;

/// Standard gravity (m/s²).
pub const GRAVITY: f32 = 9.80665;

/// One calibrated measurement, body frame.
///
/// Axis convention follows the accelerometer: a level board reads `+1 g`
/// on Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Specific force, m/s² (includes gravity).
    pub accel: Vector3<f32>,
    /// Angular rate, rad/s.
    pub gyro: Vector3<f32>,
    /// Magnetic field, µT.  `None` when the magnetometer is disabled or
    /// has not produced a measurement yet.
    pub mag: Option<Vector3<f32>>,
    /// Die temperature, °C.
    pub temperature_c: f32,
    /// Per-driver sample counter, incremented on every successful read.
    pub sequence: u32,
}

impl Default for ImuSample {
    fn default() -> Self {
        Self {
            accel: Vector3::new(0.0, 0.0, GRAVITY),
            gyro: Vector3::zeros(),
            mag: None,
            temperature_c: 25.0,
            sequence: 0,
        }
    }
}

/// Roll/pitch/yaw in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
    /// Tilt-compensated magnetic heading, only when a field is available.
    pub yaw: Option<f32>,
}

impl ImuSample {
    /// Static attitude from gravity and (if present) the magnetic field.
    ///
    /// Only meaningful while the board is not accelerating.
    pub fn attitude(&self) -> Attitude {
        let a = self.accel;
        let roll = a.y.atan2(a.z);
        let pitch = (-a.x).atan2((a.y * a.y + a.z * a.z).sqrt());

        let yaw = self.mag.map(|m| {
            let (sin_r, cos_r) = roll.sin_cos();
            let (sin_p, cos_p) = pitch.sin_cos();
            let xh = m.x * cos_p + m.y * sin_r * sin_p + m.z * cos_r * sin_p;
            let yh = m.y * cos_r - m.z * sin_r;
            (-yh).atan2(xh)
        });

        Attitude { roll, pitch, yaw }
    }
}

/// Readiness / fault state reported by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuStatus {
    /// `init()` has not completed.
    Uninitialized,
    /// Producing samples.
    Ready,
    /// Initialisation failed or reads keep failing.
    Faulted(ImuError),
}

/// Capability interface every IMU driver provides.
pub trait Imu {
    /// Which driver this is.
    fn kind(&self) -> DriverKind;

    /// Probe and configure the device.  Safe to call again to recover from
    /// a fault.
    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ImuError>;

    /// Read one calibrated sample.
    fn read(&mut self) -> Result<ImuSample, ImuError>;

    /// Current readiness / fault state.
    fn status(&self) -> ImuStatus;

    fn is_ready(&self) -> bool {
        self.status() == ImuStatus::Ready
    }
}

/// Uniform construction: every driver is attached to a bus handle and a
/// configuration the same way.  Attaching performs no I/O.
pub trait ImuDriver<B>: Imu + Sized {
    fn attach(bus: B, config: &ImuConfig) -> Self;
}
