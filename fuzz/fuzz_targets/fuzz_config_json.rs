//! Fuzz target: `ImuConfig::from_json`
//!
//! Arbitrary UTF-8 through the JSON loader.  Rejection is fine; panics and
//! accepted-but-invalid configs are not.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use necba_imu::config::ImuConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = ImuConfig::from_json(text) {
        assert_eq!(config.validate(), Ok(()));
        // Driver flags parse independently of resolution.
        let _ = config.drivers.resolve();
    }
});
