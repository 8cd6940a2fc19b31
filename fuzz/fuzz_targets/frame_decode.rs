#![no_main]

use libfuzzer_sys::fuzz_target;
use pc60fw_codec::{decode_frame, interpret, FrameDecoder};

fuzz_target!(|data: &[u8]| {
    let _ = decode_frame(data);

    let split = data.first().map(|b| 1 + (*b as usize % 16)).unwrap_or(1);
    let mut decoder = FrameDecoder::new();
    for chunk in data.chunks(split) {
        for message in decoder.ingest(chunk) {
            let _ = interpret(&message);
        }
    }
});
