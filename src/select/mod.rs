//! IMU driver selection.
//!
//! Exactly one driver backs the firmware's IMU.  It is chosen two ways:
//!
//! - **Build time**: one of the cargo features `mpu9150`, `mpu9250`,
//!   `fake-imu`.  [`ActiveImu`] aliases the matching driver type with no
//!   runtime dispatch, and zero or multiple features fail the build with a
//!   `compile_error!` naming the problem.
//! - **Startup time**: a [`DriverFlags`] value (from config or legacy
//!   `USE_*_IMU` names) is resolved once, recorded with [`install`], and
//!   turned into an [`AnyImu`] behind the same [`Imu`](crate::sensors::Imu)
//!   trait.
//!
//! Both paths share [`DriverFlags::resolve`], which scans drivers in
//! declaration order and reports ambiguity instead of picking the first
//! match.

mod any;

use core::fmt;
use std::sync::OnceLock;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::config::ImuConfig;
use crate::error::{ConfigError, SelectError};
use crate::sensors::ImuDriver;

pub use any::AnyImu;

// ---------------------------------------------------------------------------
// Build-time guards
// ---------------------------------------------------------------------------

#[cfg(not(any(feature = "mpu9150", feature = "mpu9250", feature = "fake-imu")))]
compile_error!(
    "no IMU driver configured: enable exactly one of the `mpu9150`, `mpu9250` or `fake-imu` \
     features (e.g. `cargo build --no-default-features --features mpu9250`)"
);

#[cfg(all(feature = "mpu9150", feature = "mpu9250"))]
compile_error!("multiple IMU drivers configured: `mpu9150` and `mpu9250` are mutually exclusive");

#[cfg(all(feature = "mpu9150", feature = "fake-imu"))]
compile_error!(
    "multiple IMU drivers configured: `mpu9150` and `fake-imu` are mutually exclusive \
     (`fake-imu` is a default feature; build with `--no-default-features`)"
);

#[cfg(all(feature = "mpu9250", feature = "fake-imu"))]
compile_error!(
    "multiple IMU drivers configured: `mpu9250` and `fake-imu` are mutually exclusive \
     (`fake-imu` is a default feature; build with `--no-default-features`)"
);

// ---------------------------------------------------------------------------
// Driver identifiers
// ---------------------------------------------------------------------------

/// Closed set of supported drivers.  Declaration order is resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Mpu9150,
    Mpu9250,
    Fake,
}

impl DriverKind {
    pub const ALL: [DriverKind; 3] = [Self::Mpu9150, Self::Mpu9250, Self::Fake];

    /// Every build feature, for diagnostics.
    pub const FEATURE_LIST: &'static str = "`mpu9150`, `mpu9250`, `fake-imu`";

    /// Cargo feature that selects this driver at build time.
    pub const fn feature(self) -> &'static str {
        match self {
            Self::Mpu9150 => "mpu9150",
            Self::Mpu9250 => "mpu9250",
            Self::Fake => "fake-imu",
        }
    }

    /// Legacy build-flag name, accepted by [`DriverFlags::from_legacy_flags`].
    pub const fn legacy_flag(self) -> &'static str {
        match self {
            Self::Mpu9150 => "USE_MPU9150_IMU",
            Self::Mpu9250 => "USE_MPU9250_IMU",
            Self::Fake => "USE_FAKE_IMU",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mpu9150 => "MPU-9150",
            Self::Mpu9250 => "MPU-9250",
            Self::Fake => "fake",
        }
    }

    pub fn from_legacy_flag(flag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.legacy_flag() == flag)
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Flags and resolution
// ---------------------------------------------------------------------------

/// One flag per driver.  Valid configurations set exactly one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverFlags {
    pub mpu9150: bool,
    pub mpu9250: bool,
    pub fake: bool,
}

impl DriverFlags {
    pub const NONE: Self = Self {
        mpu9150: false,
        mpu9250: false,
        fake: false,
    };

    /// Flags from the enabled cargo features.
    pub const fn from_build() -> Self {
        Self {
            mpu9150: cfg!(feature = "mpu9150"),
            mpu9250: cfg!(feature = "mpu9250"),
            fake: cfg!(feature = "fake-imu"),
        }
    }

    pub const fn only(kind: DriverKind) -> Self {
        Self::NONE.with(kind)
    }

    pub const fn with(mut self, kind: DriverKind) -> Self {
        match kind {
            DriverKind::Mpu9150 => self.mpu9150 = true,
            DriverKind::Mpu9250 => self.mpu9250 = true,
            DriverKind::Fake => self.fake = true,
        }
        self
    }

    pub const fn is_set(self, kind: DriverKind) -> bool {
        match kind {
            DriverKind::Mpu9150 => self.mpu9150,
            DriverKind::Mpu9250 => self.mpu9250,
            DriverKind::Fake => self.fake,
        }
    }

    /// Selection table in declaration order.
    pub const fn table(self) -> [(DriverKind, bool); 3] {
        [
            (DriverKind::Mpu9150, self.mpu9150),
            (DriverKind::Mpu9250, self.mpu9250),
            (DriverKind::Fake, self.fake),
        ]
    }

    /// Resolve to the single selected driver.
    pub const fn resolve(self) -> Result<DriverKind, SelectError> {
        resolve_table(&self.table())
    }

    /// Build flags from legacy names such as `USE_MPU9250_IMU`.
    pub fn from_legacy_flags<'a, I>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut flags = Self::NONE;
        for name in names {
            let kind = DriverKind::from_legacy_flag(name.trim()).ok_or(ConfigError::UnknownFlag)?;
            flags = flags.with(kind);
        }
        Ok(flags)
    }
}

/// Scan a selection table in order.  The first set entry wins only if no
/// other entry is set.
pub const fn resolve_table(table: &[(DriverKind, bool)]) -> Result<DriverKind, SelectError> {
    let mut found: Option<DriverKind> = None;
    let mut i = 0;
    while i < table.len() {
        let (kind, set) = table[i];
        if set {
            match found {
                None => found = Some(kind),
                Some(first) => return Err(SelectError::Ambiguous { first, second: kind }),
            }
        }
        i += 1;
    }
    match found {
        Some(kind) => Ok(kind),
        None => Err(SelectError::NoDriver),
    }
}

/// Flags this binary was built with.
pub const BUILD_FLAGS: DriverFlags = DriverFlags::from_build();

/// Driver selected at build time.
pub const BUILD_DRIVER: DriverKind = match BUILD_FLAGS.resolve() {
    Ok(kind) => kind,
    Err(_) => panic!("invalid IMU driver feature selection"),
};

// ---------------------------------------------------------------------------
// Build-time alias
// ---------------------------------------------------------------------------

/// The driver type the firmware uses, fixed by the enabled feature.
#[cfg(feature = "mpu9150")]
pub type ActiveImu<B> = crate::sensors::Mpu9150<B>;

/// The driver type the firmware uses, fixed by the enabled feature.
#[cfg(feature = "mpu9250")]
pub type ActiveImu<B> = crate::sensors::Mpu9250<B>;

/// The driver type the firmware uses, fixed by the enabled feature.
#[cfg(feature = "fake-imu")]
pub type ActiveImu<B> = crate::sensors::FakeImu<B>;

const _: () = assert!(
    ActiveImu::<()>::KIND as u8 == BUILD_DRIVER as u8,
    "ActiveImu does not match the selected driver feature"
);

/// Attach the build-selected driver to `bus`.
pub fn attach_active<B>(bus: B, config: &ImuConfig) -> ActiveImu<B>
where
    ActiveImu<B>: ImuDriver<B>,
{
    info!("attaching {} IMU driver", BUILD_DRIVER);
    ActiveImu::<B>::attach(bus, config)
}

// ---------------------------------------------------------------------------
// Startup-time handle
// ---------------------------------------------------------------------------

/// Write-once record of the driver in effect.
#[derive(Debug, Default)]
pub struct DriverSlot {
    kind: OnceLock<DriverKind>,
}

impl DriverSlot {
    pub const fn new() -> Self {
        Self {
            kind: OnceLock::new(),
        }
    }

    /// Record `kind`.  Installing the same kind again is a no-op; a
    /// different kind is rejected.
    pub fn install(&self, kind: DriverKind) -> Result<DriverKind, SelectError> {
        let installed = *self.kind.get_or_init(|| kind);
        if installed == kind {
            Ok(kind)
        } else {
            Err(SelectError::AlreadyInstalled(installed))
        }
    }

    pub fn get(&self) -> Option<DriverKind> {
        self.kind.get().copied()
    }
}

static ACTIVE: DriverSlot = DriverSlot::new();

/// Record the process-wide driver.  Call once during startup.
pub fn install(kind: DriverKind) -> Result<DriverKind, SelectError> {
    let kind = ACTIVE
        .install(kind)
        .inspect_err(|e| error!("IMU driver install rejected: {e}"))?;
    info!("IMU driver: {} (feature `{}`)", kind, kind.feature());
    Ok(kind)
}

/// Resolve `flags` and install the result.
pub fn install_from(flags: DriverFlags) -> Result<DriverKind, SelectError> {
    let kind = flags
        .resolve()
        .inspect_err(|e| error!("IMU driver selection failed: {e}"))?;
    install(kind)
}

/// The installed driver, if startup has run.
pub fn active() -> Option<DriverKind> {
    ACTIVE.get()
}
