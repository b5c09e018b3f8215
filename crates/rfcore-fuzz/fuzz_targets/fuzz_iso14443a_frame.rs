#![no_main]
use libfuzzer_sys::fuzz_target;

use rfcore_core::framing::iso14443a::StandardFrame;

// Untrusted radio input is the natural fuzz boundary for the 14443-A
// framing layer (spec.md §1's byte-frame transport assumption starts here).
fuzz_target!(|data: &[u8]| {
    let frame = StandardFrame::from_data(data);
    let _ = frame.parity_ok();
    let _ = frame.data();

    let with_crc = StandardFrame::from_data_with_crc(data);
    let _ = with_crc.crc_ok();
});
