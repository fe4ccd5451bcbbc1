//! Fuzz target: `ImuConfig::from_bytes`
//!
//! Feeds arbitrary bytes to the NVS blob decoder.  It must never panic, and
//! any config it accepts must validate and survive a re-encode.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use necba_imu::config::ImuConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = ImuConfig::from_bytes(data) {
        assert_eq!(config.validate(), Ok(()));
        let bytes = config.to_bytes().expect("accepted config must encode");
        assert_eq!(ImuConfig::from_bytes(&bytes), Ok(config));
    }
});
