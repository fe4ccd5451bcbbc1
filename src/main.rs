//! NECBA IMU firmware entry point.
//!
//! Brings up the build-selected IMU driver on I2C0 and polls it at the
//! configured rate.  A misconfigured driver selection never gets this far:
//! the feature guards reject it at build time, and `select::install_from`
//! refuses to start otherwise.
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::FromValueType;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use necba_imu::pins;
use necba_imu::sampler::Sampler;
use necba_imu::select::{self, BUILD_DRIVER, BUILD_FLAGS};
use necba_imu::sensors::Imu;
use necba_imu::storage::{self, NvsStore};

/// Back-off between bring-up attempts while the sensor is not answering.
const INIT_RETRY_MS: u32 = 1000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("NECBA IMU v{} ({} driver)", env!("CARGO_PKG_VERSION"), BUILD_DRIVER);

    // ── 2. Driver selection ───────────────────────────────────
    let kind = select::install_from(BUILD_FLAGS)?;

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let config = match EspDefaultNvsPartition::take()
        .context("NVS partition")
        .and_then(|p| Ok(NvsStore::new(p)?))
    {
        Ok(mut store) => storage::load_config(&mut store),
        Err(e) => {
            warn!("NVS unavailable ({:#}), running with defaults", e);
            necba_imu::config::ImuConfig::default()
        }
    };
    match config.drivers.resolve() {
        Ok(requested) if requested == kind => {}
        Ok(requested) => warn!(
            "stored config requests the {} driver but this build uses {}; ignoring",
            requested, kind
        ),
        Err(e) => warn!("stored driver flags ignored: {}", e),
    }

    // ── 4. I²C bus ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let i2c_config = I2cConfig::new().baudrate(pins::I2C_FREQ_KHZ.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &i2c_config,
    )
    .context("I2C0 init")?;
    info!(
        "I2C0: SDA=GPIO{} SCL=GPIO{} @ {} kHz",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        pins::I2C_FREQ_KHZ
    );

    // ── 5. Driver bring-up ────────────────────────────────────
    let mut delay = FreeRtos;
    let mut imu = select::attach_active(i2c, &config);
    while let Err(e) = imu.init(&mut delay) {
        error!("IMU bring-up failed: {}; retrying in {} ms", e, INIT_RETRY_MS);
        FreeRtos::delay_ms(INIT_RETRY_MS);
    }

    // ── 6. Sampling loop ──────────────────────────────────────
    let period_ms = config.sample_period_ms();
    let mut sampler = Sampler::new(imu, config.telemetry_every);
    info!("sampling every {} ms", period_ms);

    loop {
        if !sampler.imu().is_ready() {
            if let Err(e) = sampler.imu_mut().init(&mut delay) {
                warn!("IMU recovery failed: {}", e);
                FreeRtos::delay_ms(INIT_RETRY_MS);
                continue;
            }
        }
        sampler.tick();
        FreeRtos::delay_ms(period_ms);
    }
}
