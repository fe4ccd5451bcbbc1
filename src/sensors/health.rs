//! Fault detection shared by all drivers.
//!
//! Tracks three things:
//! - whether `init()` completed (or why it failed),
//! - consecutive read failures (fault latches at `fault_threshold`),
//! - repeated identical raw frames, which a live MEMS sensor never
//!   produces because of noise in the low bits.
//!
//! A good read clears the failure count, so a transient bus glitch does not
//! latch a fault.

use crate::error::ImuError;
use crate::sensors::ImuStatus;
use crate::sensors::invensense::FRAME_LEN;

#[derive(Debug, Clone)]
pub struct HealthMonitor {
    fault_threshold: u8,
    /// Identical frames tolerated before reporting `Stuck`; 0 disables.
    stuck_threshold: u16,
    initialized: bool,
    init_error: Option<ImuError>,
    consecutive_errors: u8,
    last_error: Option<ImuError>,
    last_frame: Option<[u8; FRAME_LEN]>,
    repeats: u16,
}

impl HealthMonitor {
    pub fn new(fault_threshold: u8, stuck_threshold: u16) -> Self {
        Self {
            fault_threshold: fault_threshold.max(1),
            stuck_threshold,
            initialized: false,
            init_error: None,
            consecutive_errors: 0,
            last_error: None,
            last_frame: None,
            repeats: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        self.init_error = None;
        self.consecutive_errors = 0;
        self.last_error = None;
        self.last_frame = None;
        self.repeats = 0;
    }

    /// Record a failed `init()`.  Returns `e` so it can be used in `map_err`.
    pub fn record_init_failure(&mut self, e: ImuError) -> ImuError {
        self.initialized = false;
        self.init_error = Some(e);
        e
    }

    /// Record a failed read.  Returns `e` so it can be used in `map_err`.
    pub fn record_error(&mut self, e: ImuError) -> ImuError {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.last_error = Some(e);
        e
    }

    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Record a raw frame, checking for stuck output.  Counts as a success
    /// unless the frame has repeated `stuck_threshold` times.
    pub fn record_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), ImuError> {
        if self.last_frame.as_ref() == Some(frame) {
            self.repeats = self.repeats.saturating_add(1);
        } else {
            self.last_frame = Some(*frame);
            self.repeats = 0;
        }

        if self.stuck_threshold > 0 && self.repeats >= self.stuck_threshold {
            return Err(self.record_error(ImuError::Stuck));
        }
        self.record_success();
        Ok(())
    }

    pub fn status(&self) -> ImuStatus {
        if let Some(e) = self.init_error {
            return ImuStatus::Faulted(e);
        }
        if !self.initialized {
            return ImuStatus::Uninitialized;
        }
        if self.consecutive_errors >= self.fault_threshold {
            return ImuStatus::Faulted(self.last_error.unwrap_or(ImuError::Bus));
        }
        ImuStatus::Ready
    }
}
