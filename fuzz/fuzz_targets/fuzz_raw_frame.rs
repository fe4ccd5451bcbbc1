//! Fuzz target: raw measurement decoding
//!
//! Decodes arbitrary 14-byte accel/temp/gyro frames and AK89xx field
//! blocks.  Scaling must stay finite for every input at every range.
//!
//! cargo fuzz run fuzz_raw_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use necba_imu::sensors::ak89xx::{MagChip, asa_factor, field_from_raw};
use necba_imu::sensors::invensense::{AccelRange, FRAME_LEN, GyroRange, RawFrame};

fuzz_target!(|data: &[u8]| {
    let Some(bytes) = data.get(..FRAME_LEN) else {
        return;
    };
    let mut buf = [0u8; FRAME_LEN];
    buf.copy_from_slice(bytes);
    let frame = RawFrame::decode(&buf);

    for range in [AccelRange::G2, AccelRange::G16] {
        for raw in frame.accel {
            assert!((f32::from(raw) * range.scale()).is_finite());
        }
    }
    for range in [GyroRange::Dps250, GyroRange::Dps2000] {
        for raw in frame.gyro {
            assert!((f32::from(raw) * range.scale()).is_finite());
        }
    }

    let mut mag = [0u8; 6];
    mag.copy_from_slice(&buf[..6]);
    let asa = [asa_factor(buf[6]), asa_factor(buf[7]), asa_factor(buf[8])];
    for chip in [MagChip::Ak8975, MagChip::Ak8963] {
        let field = field_from_raw(chip, &mag, asa);
        assert!(field.iter().all(|v| v.is_finite()));
    }
});
