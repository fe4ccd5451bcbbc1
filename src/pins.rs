//! Bus and pin assignments for the NECBA main board.
//!
//! Single source of truth: drivers and the startup path reference this
//! module rather than hard-coding pin numbers or addresses.

// ---------------------------------------------------------------------------
// I²C bus (IMU)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;
/// Fast-mode; both MPU-9150 and MPU-9250 support 400 kHz.
pub const I2C_FREQ_KHZ: u32 = 400;

// ---------------------------------------------------------------------------
// Device addresses
// ---------------------------------------------------------------------------

/// Accel/gyro die with AD0 tied low (board default).
pub const IMU_ADDR_AD0_LOW: u8 = 0x68;
/// Accel/gyro die with AD0 tied high.
pub const IMU_ADDR_AD0_HIGH: u8 = 0x69;
