//! Persistent storage for [`ImuConfig`].
//!
//! The config is kept as a single postcard blob.  On ESP-IDF it lives in
//! the default NVS partition; on the host an in-memory map stands in so the
//! load/save path can be tested.
//!
//! Loading never fails: a missing, unreadable or invalid blob falls back to
//! the defaults with a warning.  Saving validates first.

use std::collections::HashMap;

use log::{info, warn};

use crate::config::ImuConfig;
use crate::error::ConfigError;

pub const NAMESPACE: &str = "necba-imu";
pub const CONFIG_KEY: &str = "imucfg";

/// Largest blob accepted on load or save.
pub const MAX_BLOB_SIZE: usize = 512;

/// Key/value blob storage.
pub trait BlobStore {
    /// Copy the blob stored under `key` into `buf`.  `Ok(None)` if absent.
    fn get<'a>(&mut self, key: &str, buf: &'a mut [u8]) -> Result<Option<&'a [u8]>, ConfigError>;

    fn set(&mut self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Stored config, or defaults if there is none usable.
pub fn load_config<S: BlobStore>(store: &mut S) -> ImuConfig {
    let mut buf = [0u8; MAX_BLOB_SIZE];
    match store.get(CONFIG_KEY, &mut buf) {
        Ok(Some(bytes)) => match ImuConfig::from_bytes(bytes) {
            Ok(config) => {
                info!("loaded IMU config ({} bytes)", bytes.len());
                config
            }
            Err(e) => {
                warn!("stored IMU config rejected ({}), using defaults", e);
                ImuConfig::default()
            }
        },
        Ok(None) => {
            info!("no stored IMU config, using defaults");
            ImuConfig::default()
        }
        Err(e) => {
            warn!("IMU config read failed ({}), using defaults", e);
            ImuConfig::default()
        }
    }
}

pub fn save_config<S: BlobStore>(store: &mut S, config: &ImuConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let bytes = config.to_bytes()?;
    if bytes.len() > MAX_BLOB_SIZE {
        return Err(ConfigError::Encode);
    }
    store.set(CONFIG_KEY, &bytes)?;
    info!("IMU config saved ({} bytes)", bytes.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Host backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get<'a>(&mut self, key: &str, buf: &'a mut [u8]) -> Result<Option<&'a [u8]>, ConfigError> {
        let Some(blob) = self.blobs.get(key) else {
            return Ok(None);
        };
        let dst = buf.get_mut(..blob.len()).ok_or(ConfigError::Storage)?;
        dst.copy_from_slice(blob);
        Ok(Some(dst))
    }

    fn set(&mut self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.blobs.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NVS backend
// ---------------------------------------------------------------------------

#[cfg(feature = "espidf")]
pub use nvs::NvsStore;

#[cfg(feature = "espidf")]
mod nvs {
    use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
    use log::{info, warn};

    use super::{BlobStore, NAMESPACE};
    use crate::error::ConfigError;

    pub struct NvsStore {
        nvs: EspNvs<NvsDefault>,
    }

    impl NvsStore {
        pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, ConfigError> {
            let nvs = EspNvs::new(partition, NAMESPACE, true).map_err(|e| {
                warn!("NVS namespace '{}' open failed: {}", NAMESPACE, e);
                ConfigError::Storage
            })?;
            info!("NVS namespace '{}' open", NAMESPACE);
            Ok(Self { nvs })
        }
    }

    impl BlobStore for NvsStore {
        fn get<'a>(&mut self, key: &str, buf: &'a mut [u8]) -> Result<Option<&'a [u8]>, ConfigError> {
            self.nvs.get_blob(key, buf).map_err(|e| {
                warn!("NVS read '{}' failed: {}", key, e);
                ConfigError::Storage
            })
        }

        fn set(&mut self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.nvs.set_blob(key, data).map_err(|e| {
                warn!("NVS write '{}' failed: {}", key, e);
                ConfigError::Storage
            })
        }
    }
}
