//! Software-only IMU for test builds and bench setups without a sensor.
//!
//! Reports a level, stationary board (1 g on +Z, zero rates, a fixed
//! northern-hemisphere field) unless samples have been scripted with
//! [`FakeImu::push_sample`].  [`FakeImu::fail_next`] injects read
//! failures so fault handling can be exercised without hardware.
//!
//! The driver takes ownership of the bus handle it is attached with, just
//! like the real drivers, so switching a build to the fake driver needs no
//! call-site changes.

use embedded_hal::delay::DelayNs;
use heapless::Deque;
use log::{debug, info};
use nalgebra::Vector3;

use crate::config::ImuConfig;
use crate::error::ImuError;
use crate::select::DriverKind;
use crate::sensors::health::HealthMonitor;
use crate::sensors::{Imu, ImuDriver, ImuSample, ImuStatus};

/// Scripted samples held at most.
pub const SCRIPT_CAPACITY: usize = 32;

pub struct FakeImu<B = ()> {
    bus: B,
    baseline: ImuSample,
    script: Deque<ImuSample, SCRIPT_CAPACITY>,
    fail_next: u16,
    health: HealthMonitor,
    sequence: u32,
}

impl<B> FakeImu<B> {
    pub const KIND: DriverKind = DriverKind::Fake;

    pub fn new(bus: B, config: &ImuConfig) -> Self {
        // A simulated sensor repeats itself, so stuck detection stays off.
        Self {
            bus,
            baseline: Self::level_sample(config.mag_enabled),
            script: Deque::new(),
            fail_next: 0,
            health: HealthMonitor::new(config.fault_threshold, 0),
            sequence: 0,
        }
    }

    /// Level, stationary, 25 °C, field pointing north and down.
    pub fn level_sample(with_mag: bool) -> ImuSample {
        ImuSample {
            mag: with_mag.then(|| Vector3::new(20.0, 0.0, -40.0)),
            ..ImuSample::default()
        }
    }

    /// Replace the sample returned when the script is empty.
    pub fn set_baseline(&mut self, sample: ImuSample) {
        self.baseline = sample;
    }

    /// Queue a sample to be returned by a future `read()`.  Hands the
    /// sample back if the script is full.
    pub fn push_sample(&mut self, sample: ImuSample) -> Result<(), ImuSample> {
        self.script.push_back(sample)
    }

    pub fn pending(&self) -> usize {
        self.script.len()
    }

    /// Make the next `count` reads fail with [`ImuError::Simulated`].
    pub fn fail_next(&mut self, count: u16) {
        self.fail_next = count;
    }

    pub fn release(self) -> B {
        self.bus
    }
}

impl<B> Imu for FakeImu<B> {
    fn kind(&self) -> DriverKind {
        DriverKind::Fake
    }

    fn init<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), ImuError> {
        self.health.mark_initialized();
        info!("fake IMU ready ({} scripted samples)", self.script.len());
        Ok(())
    }

    fn read(&mut self) -> Result<ImuSample, ImuError> {
        if !self.health.is_initialized() {
            return Err(ImuError::NotInitialized);
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            debug!("fake IMU: injected failure ({} left)", self.fail_next);
            return Err(self.health.record_error(ImuError::Simulated));
        }

        let mut sample = self.script.pop_front().unwrap_or(self.baseline);
        self.sequence = self.sequence.wrapping_add(1);
        sample.sequence = self.sequence;
        self.health.record_success();
        Ok(sample)
    }

    fn status(&self) -> ImuStatus {
        self.health.status()
    }
}

impl<B> ImuDriver<B> for FakeImu<B> {
    fn attach(bus: B, config: &ImuConfig) -> Self {
        Self::new(bus, config)
    }
}
