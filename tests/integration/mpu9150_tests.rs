//! MPU-9150 driver against the mock bus.

use necba_imu::config::ImuConfig;
use necba_imu::error::ImuError;
use necba_imu::select::DriverKind;
use necba_imu::sensors::invensense::{AccelRange, GyroRange, reg};
use necba_imu::sensors::{GRAVITY, Imu, Mpu9150};

use crate::mock_i2c::{AK_CNTL1, AK_ST1, AK_ST2, IMU_ADDR, MAG_ADDR, MockI2c, NoDelay};

const EPS: f32 = 1e-3;

fn ready(config: &ImuConfig) -> (Mpu9150<MockI2c>, MockI2c) {
    let bus = MockI2c::with_imu(0x68, true);
    bus.set_frame([0, 0, 8192], -3400, [0, 0, 0]);
    bus.set_mag([100, 200, -300]);
    let mut imu = Mpu9150::new(bus.clone(), config);
    imu.init(&mut NoDelay).unwrap();
    (imu, bus)
}

#[test]
fn bring_up_skips_accel_filter_register() {
    let (imu, bus) = ready(&ImuConfig::default());
    assert_eq!(imu.kind(), DriverKind::Mpu9150);
    assert!(bus.wrote(IMU_ADDR, reg::CONFIG, 0x03));
    assert!(!bus.wrote_reg(IMU_ADDR, reg::ACCEL_CONFIG_2));
    // Single-measurement mode.
    assert_eq!(bus.reg(MAG_ADDR, AK_CNTL1), 0x01);
}

#[test]
fn temperature_uses_9150_formula() {
    let (mut imu, _bus) = ready(&ImuConfig::default());
    let s = imu.read().unwrap();
    assert!((s.temperature_c - 25.0).abs() < 1e-3);
    assert!((s.accel.z - GRAVITY).abs() < EPS);
}

#[test]
fn ak8975_is_rearmed_after_each_read() {
    let (mut imu, bus) = ready(&ImuConfig::default());
    bus.clear_writes();
    let mag = imu.read().unwrap().mag.unwrap();
    assert!(bus.wrote(MAG_ADDR, AK_CNTL1, 0x01));
    assert!((mag.x - 60.0).abs() < EPS);
    assert!((mag.y - 30.0).abs() < EPS);
    assert!((mag.z - 90.0).abs() < EPS);
}

#[test]
fn overflowed_measurement_keeps_previous_field() {
    let (mut imu, bus) = ready(&ImuConfig::default());
    let first = imu.read().unwrap().mag;
    bus.set_mag([1, 2, 3]);
    bus.set_reg(MAG_ADDR, AK_ST2, 0x08);
    assert_eq!(imu.read().unwrap().mag, first);
}

#[test]
fn measurement_is_collected_once() {
    let (mut imu, bus) = ready(&ImuConfig::default());
    imu.read().unwrap();
    // Reading ST2 powered the part down until the driver re-armed it.
    assert_eq!(bus.reg(MAG_ADDR, AK_CNTL1), 0x01);
    assert_eq!(bus.reg(MAG_ADDR, AK_ST1) & 0x01, 0x01);
}

#[test]
fn no_data_ready_before_first_measurement() {
    let (mut imu, bus) = ready(&ImuConfig::default());
    bus.set_reg(MAG_ADDR, AK_ST1, 0x00);
    assert_eq!(imu.read().unwrap().mag, None);
}

#[test]
fn failed_rearm_is_retried_on_next_read() {
    let (mut imu, bus) = ready(&ImuConfig::default());
    imu.read().unwrap();

    // The sample is still collected when the follow-up command is lost.
    bus.set_mag([200, 400, -600]);
    bus.fail_next_write(MAG_ADDR, AK_CNTL1);
    let mag = imu.read().unwrap().mag.unwrap();
    assert!((mag.y - 60.0).abs() < EPS);
    assert_eq!(bus.reg(MAG_ADDR, AK_ST1) & 0x01, 0x00);

    for k in 3..8i16 {
        bus.clear_writes();
        bus.set_mag([100 * k, 200 * k, -300 * k]);
        let mag = imu.read().unwrap().mag.unwrap();
        assert!(bus.wrote(MAG_ADDR, AK_CNTL1, 0x01));
        assert!((mag.y - 30.0 * f32::from(k)).abs() < EPS, "field frozen at {mag:?}");
    }
    assert!(imu.is_ready());
}

#[test]
fn mpu9250_id_is_rejected() {
    let bus = MockI2c::with_imu(0x71, true);
    let mut imu = Mpu9150::new(bus, &ImuConfig::default());
    assert_eq!(
        imu.init(&mut NoDelay),
        Err(ImuError::UnknownDevice {
            expected: 0x68,
            found: 0x71
        })
    );
}

#[test]
fn missing_device_is_a_bus_error() {
    let mut imu = Mpu9150::new(MockI2c::new(), &ImuConfig::default());
    assert_eq!(imu.init(&mut NoDelay), Err(ImuError::Bus));
}

#[test]
fn ranges_are_programmed_and_used_for_scaling() {
    let config = ImuConfig {
        gyro_range: GyroRange::Dps2000,
        accel_range: AccelRange::G16,
        ..ImuConfig::default()
    };
    let (mut imu, bus) = ready(&config);
    assert!(bus.wrote(IMU_ADDR, reg::GYRO_CONFIG, 0x18));
    assert!(bus.wrote(IMU_ADDR, reg::ACCEL_CONFIG, 0x18));

    bus.set_frame([0, 0, 2048], 0, [164, 0, 0]);
    let s = imu.read().unwrap();
    assert!((s.accel.z - GRAVITY).abs() < EPS);
    assert!((s.gyro.x - 10f32.to_radians()).abs() < EPS);
}

#[test]
fn alternate_address_is_used() {
    let bus = MockI2c::new();
    bus.attach(0x69);
    bus.set_reg(0x69, reg::WHO_AM_I, 0x68);
    let config = ImuConfig {
        i2c_address: 0x69,
        mag_enabled: false,
        ..ImuConfig::default()
    };
    let mut imu = Mpu9150::new(bus.clone(), &config);
    imu.init(&mut NoDelay).unwrap();
    assert!(bus.writes().iter().all(|w| w.addr == 0x69));
}
