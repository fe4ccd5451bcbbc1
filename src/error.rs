//! Error types for the IMU firmware.
//!
//! Each subsystem returns its own enum; operations that cross subsystems,
//! such as building a driver from a stored config, return [`Error`].  All
//! variants are `Copy` so they can be latched into driver status without
//! allocation.

use core::fmt;

use crate::select::DriverKind;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Any subsystem error, tagged with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The IMU driver failed.
    Imu(ImuError),
    /// Driver selection is misconfigured.
    Select(SelectError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imu(e) => write!(f, "imu: {e}"),
            Self::Select(e) => write!(f, "driver selection: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// IMU driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuError {
    /// I²C transaction failed.
    Bus,
    /// WHO_AM_I did not match the driver's device.
    UnknownDevice { expected: u8, found: u8 },
    /// Magnetometer did not answer with the expected WIA value.
    MagnetometerMissing { found: u8 },
    /// `read()` was called before a successful `init()`.
    NotInitialized,
    /// Sensor returned the exact same raw frame too many times in a row.
    Stuck,
    /// Injected failure from the fake driver.
    Simulated,
}

impl fmt::Display for ImuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C bus error"),
            Self::UnknownDevice { expected, found } => {
                write!(f, "unexpected WHO_AM_I {found:#04x} (expected {expected:#04x})")
            }
            Self::MagnetometerMissing { found } => {
                write!(f, "magnetometer not found (WIA {found:#04x})")
            }
            Self::NotInitialized => write!(f, "driver not initialised"),
            Self::Stuck => write!(f, "sensor output stuck"),
            Self::Simulated => write!(f, "simulated failure"),
        }
    }
}

impl core::error::Error for ImuError {}

impl From<ImuError> for Error {
    fn from(e: ImuError) -> Self {
        Self::Imu(e)
    }
}

// ---------------------------------------------------------------------------
// Driver selection errors
// ---------------------------------------------------------------------------

/// Misconfigured driver selection.  Never recovered from: the firmware
/// refuses to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    /// No driver flag was set.
    NoDriver,
    /// More than one driver flag was set.  `first` and `second` are the
    /// first two matches in declaration order.
    Ambiguous { first: DriverKind, second: DriverKind },
    /// A different driver was already installed for this process.
    AlreadyInstalled(DriverKind),
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDriver => write!(
                f,
                "no IMU driver configured; enable exactly one of {}",
                DriverKind::FEATURE_LIST
            ),
            Self::Ambiguous { first, second } => write!(
                f,
                "multiple IMU drivers configured ({} and {}); enable exactly one",
                first.feature(),
                second.feature()
            ),
            Self::AlreadyInstalled(kind) => {
                write!(f, "IMU driver already installed as {}", kind.name())
            }
        }
    }
}

impl core::error::Error for SelectError {}

impl From<SelectError> for Error {
    fn from(e: SelectError) -> Self {
        Self::Select(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// Config could not be serialized.
    Encode,
    /// A field failed range validation.  The string names the field.
    ValidationFailed(&'static str),
    /// A legacy flag name was not recognised.
    UnknownFlag,
    /// The persistent store could not be read or written.
    Storage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::Encode => write!(f, "config encode failed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::UnknownFlag => write!(f, "unknown driver flag"),
            Self::Storage => write!(f, "config storage error"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
