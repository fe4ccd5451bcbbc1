//! Periodic IMU polling.
//!
//! Wraps whichever driver was selected and turns it into a steady stream of
//! samples: a failed read hands back the last good sample, status changes
//! are logged once per transition, and a running average is logged every
//! `telemetry_every` good samples.  The logged attitude is computed from
//! the averaged accel and field, not from the window's last sample.

use log::{info, warn};
use nalgebra::Vector3;

use crate::sensors::{Imu, ImuSample, ImuStatus};

pub struct Sampler<I> {
    imu: I,
    telemetry_every: u32,
    last_good: Option<ImuSample>,
    last_status: ImuStatus,
    failures: u32,
    // Telemetry window
    window_len: u32,
    accel_sum: Vector3<f32>,
    gyro_sum: Vector3<f32>,
    temp_sum: f32,
    mag_sum: Vector3<f32>,
    mag_count: u32,
    last_window: Option<ImuSample>,
}

impl<I: Imu> Sampler<I> {
    pub fn new(imu: I, telemetry_every: u32) -> Self {
        let last_status = imu.status();
        Self {
            imu,
            telemetry_every: telemetry_every.max(1),
            last_good: None,
            last_status,
            failures: 0,
            window_len: 0,
            accel_sum: Vector3::zeros(),
            gyro_sum: Vector3::zeros(),
            temp_sum: 0.0,
            mag_sum: Vector3::zeros(),
            mag_count: 0,
            last_window: None,
        }
    }

    /// Poll the driver once.  Returns the fresh sample, or the last good one
    /// if this read failed (`None` before the first success).
    pub fn tick(&mut self) -> Option<ImuSample> {
        match self.imu.read() {
            Ok(sample) => {
                self.last_good = Some(sample);
                self.accumulate(&sample);
            }
            Err(_) => self.failures = self.failures.saturating_add(1),
        }
        self.track_status();
        self.last_good
    }

    /// Total failed reads since construction.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn last_good(&self) -> Option<ImuSample> {
        self.last_good
    }

    /// Mean of the most recently completed telemetry window.
    pub fn last_window(&self) -> Option<ImuSample> {
        self.last_window
    }

    pub fn imu(&self) -> &I {
        &self.imu
    }

    pub fn imu_mut(&mut self) -> &mut I {
        &mut self.imu
    }

    pub fn into_inner(self) -> I {
        self.imu
    }

    fn track_status(&mut self) {
        let status = self.imu.status();
        if status == self.last_status {
            return;
        }
        match status {
            ImuStatus::Faulted(e) => warn!("{} IMU faulted: {}", self.imu.kind(), e),
            ImuStatus::Ready => info!("{} IMU ready", self.imu.kind()),
            ImuStatus::Uninitialized => warn!("{} IMU uninitialised", self.imu.kind()),
        }
        self.last_status = status;
    }

    fn accumulate(&mut self, sample: &ImuSample) {
        self.accel_sum += sample.accel;
        self.gyro_sum += sample.gyro;
        self.temp_sum += sample.temperature_c;
        if let Some(mag) = sample.mag {
            self.mag_sum += mag;
            self.mag_count += 1;
        }
        self.window_len += 1;
        if self.window_len < self.telemetry_every {
            return;
        }

        let n = self.window_len as f32;
        let mean = ImuSample {
            accel: self.accel_sum / n,
            gyro: self.gyro_sum / n,
            mag: (self.mag_count > 0).then(|| self.mag_sum / self.mag_count as f32),
            temperature_c: self.temp_sum / n,
            sequence: sample.sequence,
        };
        let attitude = mean.attitude();
        info!(
            "imu avg[{}]: accel=[{:.2}, {:.2}, {:.2}] gyro=[{:.3}, {:.3}, {:.3}] T={:.1}C roll={:.1} pitch={:.1} yaw={} fails={}",
            self.window_len,
            mean.accel.x,
            mean.accel.y,
            mean.accel.z,
            mean.gyro.x,
            mean.gyro.y,
            mean.gyro.z,
            mean.temperature_c,
            attitude.roll.to_degrees(),
            attitude.pitch.to_degrees(),
            attitude
                .yaw
                .map_or_else(|| "-".into(), |y| format!("{:.1}", y.to_degrees())),
            self.failures
        );
        self.last_window = Some(mean);

        self.window_len = 0;
        self.accel_sum = Vector3::zeros();
        self.gyro_sum = Vector3::zeros();
        self.temp_sum = 0.0;
        self.mag_sum = Vector3::zeros();
        self.mag_count = 0;
    }
}
