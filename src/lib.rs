//! NECBA IMU firmware library.
//!
//! Selects exactly one IMU driver (MPU-9150, MPU-9250 or a software fake)
//! and exposes it behind the [`sensors::Imu`] trait.  The choice is made by
//! cargo feature at build time ([`select::ActiveImu`]) or from a validated
//! flag set at startup ([`select::AnyImu`]).
//!
//! Everything except the binary builds on the host, so the drivers are
//! tested against a mock I²C bus.  ESP-IDF code is gated on the `espidf`
//! feature.

#![deny(unused_must_use)]

pub mod calibration;
pub mod config;
pub mod error;
pub mod pins;
pub mod sampler;
pub mod select;
pub mod sensors;
pub mod storage;
