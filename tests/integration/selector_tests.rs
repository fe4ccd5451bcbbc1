//! Build-time and startup-time driver selection.

use necba_imu::config::ImuConfig;
use necba_imu::error::{ConfigError, SelectError};
use necba_imu::select::{self, AnyImu, BUILD_DRIVER, BUILD_FLAGS, DriverFlags, DriverKind, DriverSlot};
use necba_imu::sensors::{Imu, ImuStatus};

use crate::mock_i2c::{MockI2c, NoDelay};

#[test]
fn build_flags_name_exactly_one_driver() {
    let set = DriverKind::ALL.iter().filter(|k| BUILD_FLAGS.is_set(**k)).count();
    assert_eq!(set, 1);
    assert_eq!(BUILD_FLAGS.resolve(), Ok(BUILD_DRIVER));
}

#[test]
fn active_alias_matches_build_driver() {
    let bus = MockI2c::with_imu(0x71, true);
    let imu = select::attach_active(bus, &ImuConfig::default());
    assert_eq!(imu.kind(), BUILD_DRIVER);
    assert_eq!(imu.status(), ImuStatus::Uninitialized);
}

#[cfg(feature = "fake-imu")]
#[test]
fn default_build_runs_without_hardware() {
    let mut imu = select::attach_active(MockI2c::new(), &ImuConfig::default());
    imu.init(&mut NoDelay).unwrap();
    let s = imu.read().unwrap();
    assert!((s.accel.z - necba_imu::sensors::GRAVITY).abs() < 1e-6);
    assert_eq!(s.gyro, nalgebra::Vector3::zeros());
}

// The only test in this binary that touches the process-wide slot.
#[test]
fn process_handle_is_stable_once_installed() {
    assert_eq!(select::install_from(BUILD_FLAGS), Ok(BUILD_DRIVER));
    for _ in 0..5 {
        assert_eq!(select::active(), Some(BUILD_DRIVER));
    }
    assert_eq!(select::install(BUILD_DRIVER), Ok(BUILD_DRIVER));

    let other = DriverKind::ALL
        .into_iter()
        .find(|k| *k != BUILD_DRIVER)
        .unwrap();
    assert_eq!(
        select::install(other),
        Err(SelectError::AlreadyInstalled(BUILD_DRIVER))
    );
    assert_eq!(
        select::install_from(DriverFlags::NONE),
        Err(SelectError::NoDriver)
    );
    assert_eq!(select::active(), Some(BUILD_DRIVER));
}

#[test]
fn local_slot_rejects_a_second_driver() {
    let slot = DriverSlot::new();
    slot.install(DriverKind::Mpu9150).unwrap();
    assert_eq!(
        slot.install(DriverKind::Fake),
        Err(SelectError::AlreadyInstalled(DriverKind::Mpu9150))
    );
}

#[test]
fn legacy_flags_select_a_runtime_driver() {
    let flags = DriverFlags::from_legacy_flags(["USE_MPU9250_IMU"]).unwrap();
    let bus = MockI2c::with_imu(0x71, true);
    bus.set_frame([0, 0, 8192], 0, [0, 0, 0]);
    let mut imu = AnyImu::from_flags(flags, bus, &ImuConfig::default()).unwrap();
    assert_eq!(imu.kind(), DriverKind::Mpu9250);
    imu.init(&mut NoDelay).unwrap();
    assert!(imu.read().unwrap().mag.is_some());
}

#[test]
fn conflicting_legacy_flags_refuse_to_build() {
    let flags = DriverFlags::from_legacy_flags(["USE_FAKE_IMU", "USE_MPU9150_IMU"]).unwrap();
    let err = AnyImu::from_flags(flags, MockI2c::new(), &ImuConfig::default())
        .err()
        .unwrap();
    assert_eq!(
        err,
        SelectError::Ambiguous {
            first: DriverKind::Mpu9150,
            second: DriverKind::Fake
        }
    );
    assert!(err.to_string().contains("mpu9150"));
}

#[test]
fn unknown_legacy_flag_is_rejected() {
    assert_eq!(
        DriverFlags::from_legacy_flags(["USE_MPU6050_IMU"]),
        Err(ConfigError::UnknownFlag)
    );
}

#[test]
fn config_drivers_drive_runtime_selection() {
    let config = ImuConfig::from_json(r#"{"drivers": {"fake": true}, "mag_enabled": false}"#).unwrap();
    let mut imu = AnyImu::from_flags(config.drivers, MockI2c::new(), &config).unwrap();
    imu.init(&mut NoDelay).unwrap();
    assert_eq!(imu.kind(), DriverKind::Fake);
    assert_eq!(imu.read().unwrap().mag, None);
    let _bus: MockI2c = imu.release();
}

#[test]
fn same_bus_can_switch_drivers() {
    let bus = MockI2c::with_imu(0x68, true);
    let mut wrong = AnyImu::build(DriverKind::Mpu9250, bus, &ImuConfig::default());
    assert!(wrong.init(&mut NoDelay).is_err());

    let mut right = AnyImu::build(DriverKind::Mpu9150, wrong.release(), &ImuConfig::default());
    right.init(&mut NoDelay).unwrap();
    assert!(right.is_ready());
}
