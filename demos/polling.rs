//! A blocking polling loop over a noisy in-memory line.
//!
//! A sensor writes readings, the line drops and flips bytes, the receiver polls one byte
//! at a time and picks up every frame that survived.
//!
//! ```not_rust
//! cargo run --example polling
//! cargo run --example polling --features tracing
//! ```

use core::error::Error;

use tinylink::{TinyLink, mock::MockTransport};

const READING: u16 = 0x0010;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("sensor=info,receiver=info,tinylink=debug")
        .init();

    let buffer = &mut [0u8; 32];
    let mut sensor = TinyLink::new(MockTransport::<512>::new(), buffer);

    let mut line = Vec::new();

    for (i, reading) in [21_i16, -4, 170, 27].into_iter().enumerate() {
        tracing::info!(target: "sensor", reading, "sending reading");

        sensor.write(READING, &reading.to_le_bytes())?;

        let mut wire = sensor.transport().written().to_vec();
        sensor.transport_mut().clear_written();

        // The third reading gets a flipped bit on the way.
        if i == 2 {
            let last = wire.len() - 1;
            wire[last] ^= 0x01;
        }

        line.extend_from_slice(&[0x00, 0xAA, 0x55]);
        line.extend_from_slice(&wire);
    }

    let buffer = &mut [0u8; 32];
    let mut receiver = TinyLink::new(MockTransport::<512>::new(), buffer);

    receiver
        .transport_mut()
        .feed(&line)
        .map_err(|_| "line too long")?;

    while receiver.transport().pending() > 0 {
        let Some(frame) = receiver.try_read_frame()? else {
            continue;
        };

        match <[u8; 2]>::try_from(frame.payload()) {
            Ok(bytes) if frame.flags() == READING => {
                let reading = i16::from_le_bytes(bytes);

                tracing::info!(target: "receiver", reading, "received reading");
            }
            _ => {
                tracing::warn!(target: "receiver", flags = frame.flags(), "unexpected frame");
            }
        }
    }

    Ok(())
}
