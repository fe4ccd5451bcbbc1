use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::info;

use crate::config::ImuConfig;
use crate::error::{self, ImuError, SelectError};
use crate::select::{DriverFlags, DriverKind};
use crate::sensors::{FakeImu, Imu, ImuSample, ImuStatus, Mpu9150, Mpu9250};

/// Driver chosen at startup rather than at build time.
///
/// Every variant holds the same bus type, so one binary can carry all
/// three drivers and pick between them from a config value.
pub enum AnyImu<B> {
    Mpu9150(Mpu9150<B>),
    Mpu9250(Mpu9250<B>),
    Fake(FakeImu<B>),
}

impl<B> AnyImu<B> {
    /// Attach the driver for `kind`.  No bus traffic until `init()`.
    pub fn build(kind: DriverKind, bus: B, config: &ImuConfig) -> Self {
        info!("building {} IMU driver", kind);
        match kind {
            DriverKind::Mpu9150 => Self::Mpu9150(Mpu9150::new(bus, config)),
            DriverKind::Mpu9250 => Self::Mpu9250(Mpu9250::new(bus, config)),
            DriverKind::Fake => Self::Fake(FakeImu::new(bus, config)),
        }
    }

    /// Resolve `flags` and attach the selected driver.
    pub fn from_flags(flags: DriverFlags, bus: B, config: &ImuConfig) -> Result<Self, SelectError> {
        let kind = flags.resolve()?;
        Ok(Self::build(kind, bus, config))
    }

    /// Validate a stored config and attach the driver its `drivers` table
    /// names.
    pub fn from_config(bus: B, config: &ImuConfig) -> error::Result<Self> {
        config.validate()?;
        Ok(Self::from_flags(config.drivers, bus, config)?)
    }

    pub fn release(self) -> B {
        match self {
            Self::Mpu9150(d) => d.release(),
            Self::Mpu9250(d) => d.release(),
            Self::Fake(d) => d.release(),
        }
    }
}

impl<B: I2c> Imu for AnyImu<B> {
    fn kind(&self) -> DriverKind {
        match self {
            Self::Mpu9150(d) => d.kind(),
            Self::Mpu9250(d) => d.kind(),
            Self::Fake(d) => d.kind(),
        }
    }

    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ImuError> {
        match self {
            Self::Mpu9150(d) => d.init(delay),
            Self::Mpu9250(d) => d.init(delay),
            Self::Fake(d) => d.init(delay),
        }
    }

    fn read(&mut self) -> Result<ImuSample, ImuError> {
        match self {
            Self::Mpu9150(d) => d.read(),
            Self::Mpu9250(d) => d.read(),
            Self::Fake(d) => d.read(),
        }
    }

    fn status(&self) -> ImuStatus {
        match self {
            Self::Mpu9150(d) => d.status(),
            Self::Mpu9250(d) => d.status(),
            Self::Fake(d) => d.status(),
        }
    }
}
