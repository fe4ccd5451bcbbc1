//! Shared driver core for the InvenSense MPU-9150 / MPU-9250 family.
//!
//! Both parts expose the same accel/gyro register map, bring-up sequence
//! and 14-byte measurement burst; they differ in WHO_AM_I, temperature
//! scaling, the accelerometer DLPF register and the companion AKM
//! magnetometer.  Those differences live behind the [`Model`] trait and the
//! concrete drivers are type aliases over [`Mpu`].

use core::marker::PhantomData;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use log::{debug, error, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::calibration::Corrector;
use crate::config::ImuConfig;
use crate::error::ImuError;
use crate::select::DriverKind;
use crate::sensors::ak89xx::{MagChip, Magnetometer};
use crate::sensors::health::HealthMonitor;
use crate::sensors::{GRAVITY, Imu, ImuDriver, ImuSample, ImuStatus};

/// Register addresses and bit values (RM-MPU-9150A / RM-MPU-9250A).
pub mod reg {
    pub const SMPLRT_DIV: u8 = 0x19;
    pub const CONFIG: u8 = 0x1A;
    pub const GYRO_CONFIG: u8 = 0x1B;
    pub const ACCEL_CONFIG: u8 = 0x1C;
    /// MPU-9250 only.
    pub const ACCEL_CONFIG_2: u8 = 0x1D;
    pub const INT_PIN_CFG: u8 = 0x37;
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const USER_CTRL: u8 = 0x6A;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const WHO_AM_I: u8 = 0x75;

    pub const PWR_MGMT_1_H_RESET: u8 = 0x80;
    /// PLL with gyro X reference (9150) / auto-select (9250).
    pub const PWR_MGMT_1_CLKSEL_PLL: u8 = 0x01;
    pub const INT_PIN_CFG_BYPASS_EN: u8 = 0x02;
}

/// Accel (6) + temperature (2) + gyro (6), big-endian.
pub const FRAME_LEN: usize = 14;

const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

/// Internal sample rate with the DLPF enabled.
const INTERNAL_RATE_HZ: u16 = 1000;

// ---------------------------------------------------------------------------
// Full-scale ranges and filter settings
// ---------------------------------------------------------------------------

/// Gyroscope full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GyroRange {
    Dps250,
    #[default]
    Dps500,
    Dps1000,
    Dps2000,
}

impl GyroRange {
    pub fn register_value(self) -> u8 {
        match self {
            Self::Dps250 => 0x00,
            Self::Dps500 => 0x08,
            Self::Dps1000 => 0x10,
            Self::Dps2000 => 0x18,
        }
    }

    /// LSB per °/s.
    pub fn sensitivity(self) -> f32 {
        match self {
            Self::Dps250 => 131.0,
            Self::Dps500 => 65.5,
            Self::Dps1000 => 32.8,
            Self::Dps2000 => 16.4,
        }
    }

    /// rad/s per LSB.
    pub fn scale(self) -> f32 {
        DEG_TO_RAD / self.sensitivity()
    }
}

/// Accelerometer full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccelRange {
    G2,
    #[default]
    G4,
    G8,
    G16,
}

impl AccelRange {
    pub fn register_value(self) -> u8 {
        match self {
            Self::G2 => 0x00,
            Self::G4 => 0x08,
            Self::G8 => 0x10,
            Self::G16 => 0x18,
        }
    }

    /// LSB per g.
    pub fn sensitivity(self) -> f32 {
        match self {
            Self::G2 => 16384.0,
            Self::G4 => 8192.0,
            Self::G8 => 4096.0,
            Self::G16 => 2048.0,
        }
    }

    /// m/s² per LSB.
    pub fn scale(self) -> f32 {
        GRAVITY / self.sensitivity()
    }
}

/// Digital low-pass filter bandwidth.  The same 1..=6 code selects the
/// gyro filter (CONFIG) and, on the MPU-9250, the accel filter
/// (ACCEL_CONFIG_2) at the closest matching bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Dlpf {
    Hz184,
    Hz92,
    #[default]
    Hz41,
    Hz20,
    Hz10,
    Hz5,
}

impl Dlpf {
    pub fn register_value(self) -> u8 {
        match self {
            Self::Hz184 => 0x01,
            Self::Hz92 => 0x02,
            Self::Hz41 => 0x03,
            Self::Hz20 => 0x04,
            Self::Hz10 => 0x05,
            Self::Hz5 => 0x06,
        }
    }
}

/// SMPLRT_DIV for the requested output rate: `1000 / (1 + div)`.
pub fn sample_rate_divider(rate_hz: u16) -> u8 {
    let rate = rate_hz.clamp(4, INTERNAL_RATE_HZ);
    (INTERNAL_RATE_HZ / rate - 1).min(u16::from(u8::MAX)) as u8
}

// ---------------------------------------------------------------------------
// Raw measurement frame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pub accel: [i16; 3],
    pub temperature: i16,
    pub gyro: [i16; 3],
}

impl RawFrame {
    pub fn decode(buf: &[u8; FRAME_LEN]) -> Self {
        let be = |i: usize| i16::from_be_bytes([buf[i], buf[i + 1]]);
        Self {
            accel: [be(0), be(2), be(4)],
            temperature: be(6),
            gyro: [be(8), be(10), be(12)],
        }
    }
}

fn scaled(raw: [i16; 3], scale: f32) -> Vector3<f32> {
    Vector3::new(f32::from(raw[0]), f32::from(raw[1]), f32::from(raw[2])) * scale
}

// ---------------------------------------------------------------------------
// Register access
// ---------------------------------------------------------------------------

fn bus_error<E: embedded_hal::i2c::Error>(e: E) -> ImuError {
    debug!("i2c: {:?}", e.kind());
    ImuError::Bus
}

/// Register-level access to the IMU and, through bypass mode, to the
/// magnetometer on the same bus.
pub struct RegisterBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> RegisterBus<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterBus<I2C> {
    pub fn read_reg(&mut self, reg: u8) -> Result<u8, ImuError> {
        self.read_from(self.address, reg)
    }

    pub fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), ImuError> {
        self.write_to(self.address, reg, value)
    }

    pub fn read_from(&mut self, address: u8, reg: u8) -> Result<u8, ImuError> {
        let mut buf = [0u8; 1];
        self.read_block(address, reg, &mut buf)?;
        Ok(buf[0])
    }

    pub fn write_to(&mut self, address: u8, reg: u8, value: u8) -> Result<(), ImuError> {
        self.i2c.write(address, &[reg, value]).map_err(bus_error)
    }

    pub fn read_block(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> Result<(), ImuError> {
        self.i2c.write_read(address, &[reg], buf).map_err(bus_error)
    }

    pub fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], ImuError> {
        let mut buf = [0u8; FRAME_LEN];
        self.read_block(self.address, reg::ACCEL_XOUT_H, &mut buf)?;
        Ok(buf)
    }

    /// Reset, wake and configure the accel/gyro core, then open the
    /// auxiliary bus bypass so the magnetometer is reachable directly.
    pub fn configure<D: DelayNs>(
        &mut self,
        config: &ImuConfig,
        accel_dlpf: bool,
        delay: &mut D,
    ) -> Result<(), ImuError> {
        self.write_reg(reg::PWR_MGMT_1, reg::PWR_MGMT_1_H_RESET)?;
        delay.delay_ms(100);
        self.write_reg(reg::PWR_MGMT_1, reg::PWR_MGMT_1_CLKSEL_PLL)?;
        delay.delay_ms(10);

        self.write_reg(reg::SMPLRT_DIV, sample_rate_divider(config.sample_rate_hz))?;
        self.write_reg(reg::CONFIG, config.dlpf.register_value())?;
        self.write_reg(reg::GYRO_CONFIG, config.gyro_range.register_value())?;
        self.write_reg(reg::ACCEL_CONFIG, config.accel_range.register_value())?;
        if accel_dlpf {
            self.write_reg(reg::ACCEL_CONFIG_2, config.dlpf.register_value())?;
        }

        // Internal I2C master off, bypass on.
        self.write_reg(reg::USER_CTRL, 0x00)?;
        self.write_reg(reg::INT_PIN_CFG, reg::INT_PIN_CFG_BYPASS_EN)?;
        delay.delay_ms(10);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Per-part differences
// ---------------------------------------------------------------------------

/// What distinguishes one family member from another.
pub trait Model {
    const KIND: DriverKind;
    const NAME: &'static str;
    /// Primary WHO_AM_I value, reported in diagnostics.
    const WHO_AM_I: u8;
    const MAG_CHIP: MagChip;
    /// Whether ACCEL_CONFIG_2 exists.
    const ACCEL_DLPF: bool;

    /// Accept a WHO_AM_I value.  `Some(has_magnetometer)` when supported.
    fn identify(who_am_i: u8) -> Option<bool>;

    fn temperature_c(raw: i16) -> f32;
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Accel/gyro/magnetometer driver over a blocking I²C bus.
pub struct Mpu<I2C, M> {
    bus: RegisterBus<I2C>,
    config: ImuConfig,
    corrector: Corrector,
    mag: Option<Magnetometer>,
    health: HealthMonitor,
    sequence: u32,
    _model: PhantomData<M>,
}

impl<I2C, M: Model> Mpu<I2C, M> {
    pub const KIND: DriverKind = M::KIND;

    pub fn new(i2c: I2C, config: &ImuConfig) -> Self {
        Self {
            bus: RegisterBus::new(i2c, config.i2c_address),
            config: config.clone(),
            corrector: Corrector::new(&config.calibration, config.mount),
            mag: None,
            health: HealthMonitor::new(config.fault_threshold, config.stuck_threshold),
            sequence: 0,
            _model: PhantomData,
        }
    }

    pub fn has_magnetometer(&self) -> bool {
        self.mag.is_some()
    }

    /// Give the bus back, e.g. to hand it to another driver.
    pub fn release(self) -> I2C {
        self.bus.release()
    }
}

impl<I2C: I2c, M: Model> Mpu<I2C, M> {
    fn bring_up<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ImuError> {
        let who = self.bus.read_reg(reg::WHO_AM_I)?;
        let Some(has_mag) = M::identify(who) else {
            return Err(ImuError::UnknownDevice {
                expected: M::WHO_AM_I,
                found: who,
            });
        };
        info!("{} detected at {:#04x} (WHO_AM_I {:#04x})", M::NAME, self.bus.address(), who);

        self.bus.configure(&self.config, M::ACCEL_DLPF, delay)?;

        self.mag = None;
        if self.config.mag_enabled {
            if has_mag {
                let mut mag = Magnetometer::new(M::MAG_CHIP);
                mag.init(&mut self.bus, delay)?;
                self.mag = Some(mag);
            } else {
                warn!("{}: part has no magnetometer, heading unavailable", M::NAME);
            }
        }
        Ok(())
    }

    fn read_magnetometer(&mut self) -> Option<Vector3<f32>> {
        let mag = self.mag.as_mut()?;
        match mag.read(&mut self.bus) {
            Ok(field) => field,
            Err(e) => {
                warn!("{}: magnetometer read failed: {}", M::NAME, e);
                mag.last_field()
            }
        }
    }
}

impl<I2C: I2c, M: Model> Imu for Mpu<I2C, M> {
    fn kind(&self) -> DriverKind {
        M::KIND
    }

    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ImuError> {
        match self.bring_up(delay) {
            Ok(()) => {
                self.health.mark_initialized();
                info!(
                    "{} ready: {} Hz, {:?}, {:?}, mag={}",
                    M::NAME,
                    self.config.sample_rate_hz,
                    self.config.gyro_range,
                    self.config.accel_range,
                    self.mag.is_some()
                );
                Ok(())
            }
            Err(e) => {
                error!("{} init failed: {}", M::NAME, e);
                Err(self.health.record_init_failure(e))
            }
        }
    }

    fn read(&mut self) -> Result<ImuSample, ImuError> {
        if !self.health.is_initialized() {
            return Err(ImuError::NotInitialized);
        }

        let bytes = self
            .bus
            .read_frame()
            .map_err(|e| self.health.record_error(e))?;
        self.health.record_frame(&bytes)?;

        let raw = RawFrame::decode(&bytes);
        let accel = scaled(raw.accel, self.config.accel_range.scale());
        let gyro = scaled(raw.gyro, self.config.gyro_range.scale());
        let mag = self.read_magnetometer();
        let (accel, gyro, mag) = self.corrector.apply(accel, gyro, mag);

        self.sequence = self.sequence.wrapping_add(1);
        Ok(ImuSample {
            accel,
            gyro,
            mag,
            temperature_c: M::temperature_c(raw.temperature),
            sequence: self.sequence,
        })
    }

    fn status(&self) -> ImuStatus {
        self.health.status()
    }
}

impl<I2C: I2c, M: Model> ImuDriver<I2C> for Mpu<I2C, M> {
    fn attach(bus: I2C, config: &ImuConfig) -> Self {
        Self::new(bus, config)
    }
}
