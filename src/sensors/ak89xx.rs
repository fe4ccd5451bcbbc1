//! AKM AK8975 / AK8963 magnetometers, reached through the IMU's I²C bypass.
//!
//! The MPU-9150 carries an AK8975 (13-bit, single-shot only); the MPU-9250
//! carries an AK8963 (16-bit, continuous mode).  Both share the WIA/ST1/
//! data/ST2/CNTL layout and the fuse-ROM sensitivity adjustment.
//!
//! Readings are returned in the accelerometer frame: the magnetometer die
//! is mounted with X and Y swapped and Z inverted relative to the
//! accel/gyro die.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};
use nalgebra::Vector3;

use crate::error::ImuError;
use crate::sensors::invensense::RegisterBus;

pub const ADDRESS: u8 = 0x0C;

const WIA: u8 = 0x00;
const ST1: u8 = 0x02;
const HXL: u8 = 0x03;
const CNTL1: u8 = 0x0A;
const CNTL2: u8 = 0x0B;
const ASAX: u8 = 0x10;

pub const WIA_VALUE: u8 = 0x48;

const ST1_DRDY: u8 = 0x01;
const ST2_DERR: u8 = 0x04;
const ST2_HOFL: u8 = 0x08;

const MODE_POWER_DOWN: u8 = 0x00;
const MODE_SINGLE: u8 = 0x01;
/// Continuous mode 2 (100 Hz).
const MODE_CONTINUOUS_100HZ: u8 = 0x06;
const MODE_FUSE_ROM: u8 = 0x0F;
const OUTPUT_16BIT: u8 = 0x10;
const CNTL2_SRST: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagChip {
    Ak8975,
    Ak8963,
}

impl MagChip {
    /// µT per LSB.
    pub fn sensitivity(self) -> f32 {
        match self {
            Self::Ak8975 => 0.3,
            Self::Ak8963 => 4912.0 / 32760.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ak8975 => "AK8975",
            Self::Ak8963 => "AK8963",
        }
    }

    /// CNTL value that starts a measurement.
    fn measure_mode(self) -> u8 {
        match self {
            Self::Ak8975 => MODE_SINGLE,
            Self::Ak8963 => MODE_CONTINUOUS_100HZ | OUTPUT_16BIT,
        }
    }
}

/// Fuse-ROM sensitivity adjustment: `H * ((ASA - 128) / 256 + 1)`.
pub fn asa_factor(asa: u8) -> f32 {
    (f32::from(asa) - 128.0) / 256.0 + 1.0
}

/// Convert a data block (HXL..HZH, little-endian) to µT in the accel frame.
pub fn field_from_raw(chip: MagChip, data: &[u8; 6], asa: [f32; 3]) -> Vector3<f32> {
    let le = |i: usize| f32::from(i16::from_le_bytes([data[i], data[i + 1]]));
    let s = chip.sensitivity();
    let hx = le(0) * asa[0] * s;
    let hy = le(2) * asa[1] * s;
    let hz = le(4) * asa[2] * s;
    Vector3::new(hy, hx, -hz)
}

pub struct Magnetometer {
    chip: MagChip,
    asa: [f32; 3],
    last: Option<Vector3<f32>>,
    /// A measurement has been commanded and not yet collected.
    armed: bool,
}

impl Magnetometer {
    pub fn new(chip: MagChip) -> Self {
        Self {
            chip,
            asa: [1.0; 3],
            last: None,
            armed: false,
        }
    }

    pub fn last_field(&self) -> Option<Vector3<f32>> {
        self.last
    }

    pub fn init<I2C: I2c, D: DelayNs>(
        &mut self,
        bus: &mut RegisterBus<I2C>,
        delay: &mut D,
    ) -> Result<(), ImuError> {
        let wia = bus.read_from(ADDRESS, WIA)?;
        if wia != WIA_VALUE {
            return Err(ImuError::MagnetometerMissing { found: wia });
        }

        if self.chip == MagChip::Ak8963 {
            bus.write_to(ADDRESS, CNTL2, CNTL2_SRST)?;
            delay.delay_ms(10);
        }

        bus.write_to(ADDRESS, CNTL1, MODE_POWER_DOWN)?;
        delay.delay_ms(1);
        bus.write_to(ADDRESS, CNTL1, MODE_FUSE_ROM)?;
        delay.delay_ms(1);
        let mut asa = [0u8; 3];
        bus.read_block(ADDRESS, ASAX, &mut asa)?;
        self.asa = asa.map(asa_factor);

        bus.write_to(ADDRESS, CNTL1, MODE_POWER_DOWN)?;
        delay.delay_ms(1);
        self.armed = false;
        self.arm(bus)?;
        delay.delay_ms(10);

        self.last = None;
        info!(
            "{} ready: ASA=[{:.3}, {:.3}, {:.3}]",
            self.chip.name(),
            self.asa[0],
            self.asa[1],
            self.asa[2]
        );
        Ok(())
    }

    fn arm<I2C: I2c>(&mut self, bus: &mut RegisterBus<I2C>) -> Result<(), ImuError> {
        bus.write_to(ADDRESS, CNTL1, self.chip.measure_mode())?;
        self.armed = true;
        Ok(())
    }

    /// Latest field in µT.  Returns the previous measurement when no new
    /// one is ready, and `None` until the first one arrives.
    ///
    /// A measurement that could not be started is commanded again here, so
    /// a single failed write never stops the AK8975 for good.
    pub fn read<I2C: I2c>(
        &mut self,
        bus: &mut RegisterBus<I2C>,
    ) -> Result<Option<Vector3<f32>>, ImuError> {
        if !self.armed {
            self.arm(bus)?;
        }

        let st1 = bus.read_from(ADDRESS, ST1)?;
        if st1 & ST1_DRDY == 0 {
            return Ok(self.last);
        }

        // HXL..HZH plus ST2; reading ST2 releases the data registers.
        let mut block = [0u8; 7];
        bus.read_block(ADDRESS, HXL, &mut block)?;

        // The AK8975 measures once per command and then powers down.
        if self.chip == MagChip::Ak8975 {
            self.armed = false;
            if let Err(e) = self.arm(bus) {
                warn!("{}: next measurement not started: {}", self.chip.name(), e);
            }
        }

        let st2 = block[6];
        if st2 & (ST2_HOFL | ST2_DERR) != 0 {
            warn!("{}: measurement overflow (ST2 {:#04x})", self.chip.name(), st2);
            return Ok(self.last);
        }

        let mut data = [0u8; 6];
        data.copy_from_slice(&block[..6]);
        let field = field_from_raw(self.chip, &data, self.asa);
        self.last = Some(field);
        Ok(self.last)
    }
}
