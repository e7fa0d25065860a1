//! # tinylink
//!
//! A lightweight framing protocol for unreliable, byte oriented serial links in `no_std`
//! environments.
//!
//! Frames carry 16-bit caller defined flags and a payload. They are delimited by a preamble,
//! byte-stuffed, and protected by a header checksum and a CRC32, so a receiver can join a
//! stream at any point and resynchronizes after noise or lost bytes. Decoding is a byte
//! driven state machine that works in a caller provided scratch buffer, nothing is
//! allocated.
//!
//! - [`TinyLink`] drives a blocking [`embedded_io`](https://docs.rs/embedded-io) transport.
//! - [`FramedLink`] drives an async [`embedded_io_async`](https://docs.rs/embedded-io-async)
//!   transport and offers [`Stream`](futures::Stream) and [`Sink`](futures::Sink) adapters.
//! - [`FrameEncoder`](encode::FrameEncoder) and [`FrameDecoder`](decode::FrameDecoder) are the
//!   transport independent codec underneath.
//!
//! It's recommended to use [`embedded_io_adapters`](https://docs.rs/embedded-io-adapters/0.6.1/embedded_io_adapters/)
//! for `std` or [`tokio`](https://docs.rs/tokio/latest/tokio/index.html) streams.
//!
//! See the demos for more information.
//!
//! ## Features
//!
//! - `log`: Enables logging using [`log`](https://docs.rs/log/latest/log/).
//! - `tracing`: Enables logging using [`tracing`](https://docs.rs/tracing/latest/tracing/).
//! - `defmt`: Enables logging using [`defmt`](https://docs.rs/defmt/latest/defmt/index.html)
//!   and implements [`defmt::Format`](https://docs.rs/defmt/latest/defmt/trait.Format.html) for structs and enums.
//! - `char-fmt` (default): Logs byte slices as printable ASCII with `\xNN` escapes.
//! - `pretty-hex-fmt`: Logs byte slices as space separated hex.

#![no_std]
#![deny(unsafe_code)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod crc;
pub mod decode;
pub mod encode;
pub mod frame;
pub mod transport;

mod state;
pub use state::Phase;

mod error;
pub use encode::EncodeError;
pub use error::{ReadError, WriteError};

mod link;
pub use link::TinyLink;

mod framed;
pub use framed::FramedLink;

pub(crate) mod logging;

#[doc(hidden)]
pub mod mock;

#[cfg(test)]
mod tests;

#[cfg(test)]
extern crate std;
