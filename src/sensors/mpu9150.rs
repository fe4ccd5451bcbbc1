//! InvenSense MPU-9150: MPU-6050 accel/gyro die plus an AK8975 magnetometer.

use crate::select::DriverKind;
use crate::sensors::ak89xx::MagChip;
use crate::sensors::invensense::{Model, Mpu};

pub const WHO_AM_I_VALUE: u8 = 0x68;

/// Model marker for [`Mpu9150`].
pub struct Mpu9150Model;

impl Model for Mpu9150Model {
    const KIND: DriverKind = DriverKind::Mpu9150;
    const NAME: &'static str = "MPU-9150";
    const WHO_AM_I: u8 = WHO_AM_I_VALUE;
    const MAG_CHIP: MagChip = MagChip::Ak8975;
    const ACCEL_DLPF: bool = false;

    fn identify(who_am_i: u8) -> Option<bool> {
        // WHO_AM_I reports 0x68 regardless of the AD0 strap.
        (who_am_i == WHO_AM_I_VALUE).then_some(true)
    }

    fn temperature_c(raw: i16) -> f32 {
        f32::from(raw) / 340.0 + 35.0
    }
}

pub type Mpu9150<I2C> = Mpu<I2C, Mpu9150Model>;
