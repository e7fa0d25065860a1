#![allow(missing_docs)]

pub fn init_tracing() {
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt::Subscriber::builder()
            .with_max_level(tracing::Level::TRACE)
            .finish(),
    )
    .ok();
}

/// Flags of the reference frame.
pub const REFERENCE_FLAGS: u16 = 0x1234;

/// Payload of the reference frame. Contains both bytes that need stuffing.
pub const REFERENCE_PAYLOAD: &[u8] = &[0x10, 0xAA, 0x1B];

/// Wire bytes of the reference frame.
pub const REFERENCE_WIRE: &[u8] = &[
    // preamble
    0x55, 0xAA, 0x55, 0xAA, //
    // flags, length, header checksum
    0x34, 0x12, 0x03, 0x00, 0x25, //
    // payload
    0x10, 0x1B, 0xAA, 0x1B, 0x1B, //
    // crc 0x2215C33D
    0x3D, 0xC3, 0x15, 0x22,
];
