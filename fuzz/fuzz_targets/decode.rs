//! If we panic!, we lose.
//!
//! ```not_rust
//! cargo +nightly fuzz run decode
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use tinylink::{
    decode::FrameDecoder,
    frame::{LEN_HEADER, max_payload_len},
};

fuzz_target!(|data: &[u8]| {
    // Small buffers exercise the overrun and wrap paths, the large one real frames.
    for capacity in [0, 3, 4, 5, 9, 10, 11, 32, 1024] {
        let mut storage = [0_u8; 1024];
        let mut decoder = FrameDecoder::new(&mut storage[..capacity]);

        for &byte in data {
            if let Some(frame) = decoder.decode(byte) {
                let max = max_payload_len(capacity).expect("Frames need room");

                assert!(frame.length() <= max);
                assert!(LEN_HEADER + frame.length() < capacity);
            }

            assert!(decoder.buffered() <= capacity);
        }
    }
});
