//! A server echoing every frame back to its client until it receives a close frame.
//!
//! ```not_rust
//! cargo run --example echo
//! cargo run --example echo --features tracing
//! ```

use core::{error::Error, pin::pin};

use embedded_io_adapters::tokio_1::FromTokio;
use futures::StreamExt;
use tinylink::{
    FramedLink,
    frame::{Frame, OwnedFrame},
};

const DATA: u16 = 0x0001;
const CLOSE: u16 = 0x00FF;

fn owned(frame: Frame<'_>) -> Option<OwnedFrame<64>> {
    OwnedFrame::try_from(frame).ok()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("server=info,client=info,tinylink=debug")
        .init();

    let (server, client) = tokio::io::duplex(1024);

    let buffer = &mut [0u8; 64];
    let mut server = FramedLink::new(FromTokio::new(server), buffer);

    let server = async move {
        loop {
            // The received frame borrows the scratch buffer, copy it out before writing.
            let frame = OwnedFrame::<64>::try_from(server.next_frame().await?)?;

            tracing::info!(
                target: "server",
                flags = frame.flags(),
                payload = %String::from_utf8_lossy(frame.payload()),
                "received frame"
            );

            // echo the frame back
            server.write_frame(&frame.as_frame()).await?;

            if frame.flags() == CLOSE {
                tracing::info!(target: "server", "closing connection");

                break;
            }
        }

        Ok::<(), Box<dyn Error>>(())
    };

    let buffer = &mut [0u8; 64];
    let mut client = FramedLink::new(FromTokio::new(client), buffer);

    let client = async move {
        let items = ["Hello, world!", "\u{1B}scaped \u{AA}", "Goodbye!"];

        for item in items {
            tracing::info!(target: "client", item, "sending frame");

            client.write(DATA, item.as_bytes()).await?;
        }

        client.write(CLOSE, b"").await?;

        let stream = client.stream(owned);
        let mut stream = pin!(stream);

        while let Some(frame) = stream.next().await.transpose()? {
            let Some(frame) = frame else {
                continue;
            };

            tracing::info!(
                target: "client",
                flags = frame.flags(),
                payload = %String::from_utf8_lossy(frame.payload()),
                "received echo"
            );
        }

        Ok::<(), Box<dyn Error>>(())
    };

    let (server_result, client_result) = tokio::join!(server, client);

    server_result?;
    client_result?;

    Ok(())
}
