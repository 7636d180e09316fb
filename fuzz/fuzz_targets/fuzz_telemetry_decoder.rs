//! Fuzz target: `decode_telemetry`
//!
//! Feeds arbitrary notification payloads to the telemetry decoder and
//! checks that it never panics, accepts exactly the 4-byte payloads, and
//! that accepted samples re-encode to the same bytes.
//!
//! cargo fuzz run fuzz_telemetry_decoder

#![no_main]

use deskctl::protocol::{TELEMETRY_LEN, decode_telemetry, encode_telemetry};
use deskctl::units;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match decode_telemetry(data) {
        Ok(sample) => {
            assert_eq!(data.len(), TELEMETRY_LEN);
            let raw = u16::from_le_bytes([data[0], data[1]]);
            assert_eq!(sample.height_mm, units::wire_to_mm(raw));
            assert_eq!(encode_telemetry(raw, sample.speed), data);
        }
        Err(_) => assert_ne!(data.len(), TELEMETRY_LEN),
    }
});
