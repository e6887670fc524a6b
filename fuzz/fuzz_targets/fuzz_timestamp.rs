//! Fuzz target: `parse_timestamp`
//!
//! cargo fuzz run fuzz_timestamp

#![no_main]

use libfuzzer_sys::fuzz_target;
use pipeguard::detection::parse_timestamp;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        if let Err(e) = parse_timestamp(raw) {
            assert_eq!(e.raw, raw);
        }
    }
});
