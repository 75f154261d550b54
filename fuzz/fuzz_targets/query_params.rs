//! Fuzz target for query string parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;

use phial_core::parse_query;

fuzz_target!(|data: &[u8]| {
    if let Ok(params) = parse_query(data) {
        // Blank values are always dropped
        for values in params.values() {
            assert!(!values.is_empty());
            assert!(values.iter().all(|v| !v.is_empty()));
        }
    }
});
