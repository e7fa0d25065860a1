//! If we panic!, we lose.
//!
//! ```not_rust
//! cargo +nightly fuzz run send_receive -- -max_len=1016
//! ```
//! The first two bytes are the flags, the rest is the payload.
//! The read/write buffers are 1024 bytes, so payloads up to 1014 bytes must arrive.

#![no_main]

use std::error::Error;

use embedded_io_adapters::tokio_1::FromTokio;
use libfuzzer_sys::fuzz_target;
use tinylink::{EncodeError, FramedLink, WriteError, frame::max_payload_len};
use tokio::runtime::Runtime;

fuzz_target!(|data: &[u8]| {
    Runtime::new()
        .expect("Runtime must build")
        .block_on(fuzz(data))
        .unwrap();
});

async fn fuzz(data: &[u8]) -> Result<(), Box<dyn Error>> {
    let Some((flags, payload)) = data.split_first_chunk::<2>() else {
        return Ok(());
    };

    let flags = u16::from_le_bytes(*flags);

    let (read, write) = tokio::io::duplex(32);

    let read_buf = &mut [0u8; 1024];
    let mut reader = FramedLink::new(FromTokio::new(read), read_buf);

    let write_buf = &mut [0u8; 1024];
    let mut writer = FramedLink::new(FromTokio::new(write), write_buf);

    let max = max_payload_len(writer.capacity()).expect("1024 bytes hold a frame");

    if payload.len() > max {
        // Accepted by the encoder but dropped by a decoder of the same size.
        if payload.len() > writer.capacity() {
            assert!(matches!(
                writer.write(flags, payload).await,
                Err(WriteError::Encode(EncodeError::PayloadTooLarge))
            ));
        }

        return Ok(());
    }

    let reader = async move {
        let frame = reader.next_frame().await?;

        assert_eq!(frame.flags(), flags);
        assert_eq!(frame.payload(), payload);

        Ok::<(), Box<dyn Error>>(())
    };

    let writer = async move {
        writer.write(flags, payload).await?;

        Ok::<(), Box<dyn Error>>(())
    };

    let (reader_result, writer_result) = tokio::join!(reader, writer);

    reader_result?;
    writer_result?;

    Ok(())
}
