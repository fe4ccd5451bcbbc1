//! Fake driver used through the public API.

use nalgebra::Vector3;
use necba_imu::calibration::{Calibration, estimate_gyro_bias};
use necba_imu::config::ImuConfig;
use necba_imu::error::ImuError;
use necba_imu::sampler::Sampler;
use necba_imu::sensors::{FakeImu, Imu, ImuSample, ImuStatus};

use crate::mock_i2c::NoDelay;

fn ready() -> FakeImu {
    let mut imu = FakeImu::new((), &ImuConfig::default());
    imu.init(&mut NoDelay).unwrap();
    imu
}

#[test]
fn level_board_reads_zero_attitude() {
    let mut imu = ready();
    let att = imu.read().unwrap().attitude();
    assert!(att.roll.abs() < 1e-6);
    assert!(att.pitch.abs() < 1e-6);
    assert!(att.yaw.unwrap().abs() < 1e-6);
}

#[test]
fn sampler_bridges_injected_failures() {
    let mut sampler = Sampler::new(ready(), 10);
    let first = sampler.tick().unwrap();
    sampler.imu_mut().fail_next(5);
    for _ in 0..5 {
        assert_eq!(sampler.tick(), Some(first));
    }
    assert_eq!(sampler.imu().status(), ImuStatus::Faulted(ImuError::Simulated));
    assert_eq!(sampler.failures(), 5);

    let next = sampler.tick().unwrap();
    assert_eq!(next.sequence, first.sequence + 1);
    assert!(sampler.imu().is_ready());
}

#[test]
fn scripted_drift_is_calibrated_out() {
    let mut imu = ready();
    imu.set_baseline(ImuSample {
        gyro: Vector3::new(0.01, 0.02, -0.03),
        ..FakeImu::<()>::level_sample(true)
    });
    let bias = estimate_gyro_bias(&mut imu, 50).unwrap();

    let mut cal = Calibration::default();
    cal.add_gyro_bias(bias);
    assert!((cal.gyro_bias[0] - 0.01).abs() < 1e-6);
    assert!((cal.gyro_bias[1] - 0.02).abs() < 1e-6);
    assert!((cal.gyro_bias[2] + 0.03).abs() < 1e-6);
}

#[test]
fn bias_estimate_propagates_total_failure() {
    let mut imu = ready();
    imu.fail_next(10);
    assert_eq!(estimate_gyro_bias(&mut imu, 10), Err(ImuError::Simulated));
}
