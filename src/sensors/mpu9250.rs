//! InvenSense MPU-9250: MPU-6500 accel/gyro die plus an AK8963 magnetometer.
//!
//! Also accepts the MPU-9255 (same register map) and a bare MPU-6500,
//! which runs without heading.

use crate::select::DriverKind;
use crate::sensors::ak89xx::MagChip;
use crate::sensors::invensense::{Model, Mpu};

pub const WHO_AM_I_VALUE: u8 = 0x71;
pub const MPU9255_WHO_AM_I_VALUE: u8 = 0x73;
pub const MPU6500_WHO_AM_I_VALUE: u8 = 0x70;

const TEMP_SENSITIVITY: f32 = 333.87;
const TEMP_OFFSET_C: f32 = 21.0;

/// Model marker for [`Mpu9250`].
pub struct Mpu9250Model;

impl Model for Mpu9250Model {
    const KIND: DriverKind = DriverKind::Mpu9250;
    const NAME: &'static str = "MPU-9250";
    const WHO_AM_I: u8 = WHO_AM_I_VALUE;
    const MAG_CHIP: MagChip = MagChip::Ak8963;
    const ACCEL_DLPF: bool = true;

    fn identify(who_am_i: u8) -> Option<bool> {
        match who_am_i {
            WHO_AM_I_VALUE | MPU9255_WHO_AM_I_VALUE => Some(true),
            MPU6500_WHO_AM_I_VALUE => Some(false),
            _ => None,
        }
    }

    fn temperature_c(raw: i16) -> f32 {
        f32::from(raw) / TEMP_SENSITIVITY + TEMP_OFFSET_C
    }
}

pub type Mpu9250<I2C> = Mpu<I2C, Mpu9250Model>;
