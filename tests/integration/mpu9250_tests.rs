//! MPU-9250 driver against the mock bus.

use core::f32::consts::PI;

use necba_imu::calibration::MountOrientation;
use necba_imu::config::ImuConfig;
use necba_imu::error::ImuError;
use necba_imu::select::DriverKind;
use necba_imu::sensors::invensense::reg;
use necba_imu::sensors::{GRAVITY, Imu, ImuStatus, Mpu9250};

use crate::mock_i2c::{AK_CNTL1, IMU_ADDR, MAG_ADDR, MockI2c, NoDelay};

const EPS: f32 = 1e-3;

/// Level board at the default ranges (±4 g, ±500 °/s), 10 °/s about X.
fn level_frame(bus: &MockI2c) {
    bus.set_frame([0, 0, 8192], 1335, [655, 0, 0]);
}

fn ready(config: &ImuConfig) -> (Mpu9250<MockI2c>, MockI2c) {
    let bus = MockI2c::with_imu(0x71, true);
    level_frame(&bus);
    bus.set_mag([100, 200, -300]);
    let mut imu = Mpu9250::new(bus.clone(), config);
    imu.init(&mut NoDelay).unwrap();
    (imu, bus)
}

#[test]
fn bring_up_writes_configuration() {
    let (imu, bus) = ready(&ImuConfig::default());
    assert_eq!(imu.kind(), DriverKind::Mpu9250);
    assert!(imu.is_ready());
    assert!(imu.has_magnetometer());

    assert!(bus.wrote(IMU_ADDR, reg::PWR_MGMT_1, reg::PWR_MGMT_1_H_RESET));
    assert!(bus.wrote(IMU_ADDR, reg::SMPLRT_DIV, 9));
    assert!(bus.wrote(IMU_ADDR, reg::CONFIG, 0x03));
    assert!(bus.wrote(IMU_ADDR, reg::GYRO_CONFIG, 0x08));
    assert!(bus.wrote(IMU_ADDR, reg::ACCEL_CONFIG, 0x08));
    assert!(bus.wrote(IMU_ADDR, reg::ACCEL_CONFIG_2, 0x03));
    assert!(bus.wrote(IMU_ADDR, reg::INT_PIN_CFG, reg::INT_PIN_CFG_BYPASS_EN));
    // 16-bit continuous mode 2.
    assert_eq!(bus.reg(MAG_ADDR, AK_CNTL1), 0x16);
}

#[test]
fn reset_comes_first() {
    let (_imu, bus) = ready(&ImuConfig::default());
    let first = bus.writes()[0];
    assert_eq!((first.addr, first.reg, first.value), (IMU_ADDR, reg::PWR_MGMT_1, 0x80));
}

#[test]
fn sample_is_scaled_to_si_units() {
    let (mut imu, _bus) = ready(&ImuConfig::default());
    let s = imu.read().unwrap();
    assert!((s.accel.z - GRAVITY).abs() < EPS);
    assert!(s.accel.x.abs() < EPS);
    assert!((s.gyro.x - 10.0 * PI / 180.0).abs() < EPS);
    assert!((s.temperature_c - 25.0).abs() < 0.01);
    assert_eq!(s.sequence, 1);
}

#[test]
fn magnetometer_is_in_accel_frame() {
    let (mut imu, _bus) = ready(&ImuConfig::default());
    let mag = imu.read().unwrap().mag.unwrap();
    let lsb = 4912.0 / 32760.0;
    assert!((mag.x - 200.0 * lsb).abs() < EPS);
    assert!((mag.y - 100.0 * lsb).abs() < EPS);
    assert!((mag.z - 300.0 * lsb).abs() < EPS);
}

#[test]
fn magnetometer_loss_keeps_last_field() {
    let (mut imu, bus) = ready(&ImuConfig::default());
    let first = imu.read().unwrap().mag;
    bus.detach(MAG_ADDR);
    let s = imu.read().unwrap();
    assert_eq!(s.mag, first);
    assert!(imu.is_ready());
}

#[test]
fn mpu6500_runs_without_magnetometer() {
    let bus = MockI2c::with_imu(0x70, false);
    level_frame(&bus);
    let mut imu = Mpu9250::new(bus.clone(), &ImuConfig::default());
    imu.init(&mut NoDelay).unwrap();
    assert!(!imu.has_magnetometer());
    assert_eq!(imu.read().unwrap().mag, None);
    assert!(!bus.wrote_reg(MAG_ADDR, AK_CNTL1));
}

#[test]
fn disabled_magnetometer_is_not_touched() {
    let config = ImuConfig {
        mag_enabled: false,
        ..ImuConfig::default()
    };
    let (mut imu, bus) = ready(&config);
    assert!(!imu.has_magnetometer());
    assert!(bus.writes().iter().all(|w| w.addr == IMU_ADDR));
    assert_eq!(imu.read().unwrap().mag, None);
}

#[test]
fn wrong_chip_is_rejected() {
    let bus = MockI2c::with_imu(0x68, true);
    let mut imu = Mpu9250::new(bus, &ImuConfig::default());
    let err = ImuError::UnknownDevice {
        expected: 0x71,
        found: 0x68,
    };
    assert_eq!(imu.init(&mut NoDelay), Err(err));
    assert_eq!(imu.status(), ImuStatus::Faulted(err));
    assert_eq!(imu.read(), Err(ImuError::NotInitialized));
}

#[test]
fn bad_magnetometer_id_fails_bring_up() {
    let bus = MockI2c::with_imu(0x71, true);
    bus.set_reg(MAG_ADDR, 0x00, 0x00);
    let mut imu = Mpu9250::new(bus, &ImuConfig::default());
    assert_eq!(
        imu.init(&mut NoDelay),
        Err(ImuError::MagnetometerMissing { found: 0x00 })
    );
}

#[test]
fn bus_failures_latch_fault_until_a_good_read() {
    let (mut imu, bus) = ready(&ImuConfig::default());
    bus.set_fail(true);
    assert_eq!(imu.read(), Err(ImuError::Bus));
    assert!(imu.is_ready());
    assert_eq!(imu.read(), Err(ImuError::Bus));
    assert_eq!(imu.read(), Err(ImuError::Bus));
    assert_eq!(imu.status(), ImuStatus::Faulted(ImuError::Bus));

    bus.set_fail(false);
    assert!(imu.read().is_ok());
    assert!(imu.is_ready());
}

#[test]
fn frozen_output_is_reported_stuck() {
    let config = ImuConfig {
        stuck_threshold: 3,
        ..ImuConfig::default()
    };
    let (mut imu, bus) = ready(&config);
    for _ in 0..3 {
        assert!(imu.read().is_ok());
    }
    for _ in 0..3 {
        assert_eq!(imu.read(), Err(ImuError::Stuck));
    }
    assert_eq!(imu.status(), ImuStatus::Faulted(ImuError::Stuck));

    bus.set_frame([1, 0, 8192], 1335, [655, 0, 0]);
    assert!(imu.read().is_ok());
    assert!(imu.is_ready());
}

#[test]
fn reinit_recovers_from_fault() {
    let bus = MockI2c::with_imu(0x71, true);
    bus.set_fail(true);
    let mut imu = Mpu9250::new(bus.clone(), &ImuConfig::default());
    assert_eq!(imu.init(&mut NoDelay), Err(ImuError::Bus));
    bus.set_fail(false);
    imu.init(&mut NoDelay).unwrap();
    assert!(imu.is_ready());
}

#[test]
fn mount_and_calibration_apply_to_samples() {
    let mut config = ImuConfig {
        mount: MountOrientation::Yaw180,
        ..ImuConfig::default()
    };
    config.calibration.gyro_bias = [-0.1, 0.0, 0.0];
    let (mut imu, _bus) = ready(&config);
    let s = imu.read().unwrap();
    // +X rate in the sensor frame is -X on the board, then the bias comes off.
    assert!((s.gyro.x - (-10.0 * PI / 180.0 + 0.1)).abs() < EPS);
    assert!((s.accel.z - GRAVITY).abs() < EPS);
}

#[test]
fn sample_rate_sets_divider() {
    let config = ImuConfig {
        sample_rate_hz: 200,
        ..ImuConfig::default()
    };
    let (_imu, bus) = ready(&config);
    assert!(bus.wrote(IMU_ADDR, reg::SMPLRT_DIV, 4));
}

#[test]
fn release_returns_the_bus() {
    let (imu, bus) = ready(&ImuConfig::default());
    let mut released = imu.release();
    bus.clear_writes();
    let mut who = [0u8];
    embedded_hal::i2c::I2c::write_read(&mut released, IMU_ADDR, &[reg::WHO_AM_I], &mut who).unwrap();
    assert_eq!(who[0], 0x71);
}
