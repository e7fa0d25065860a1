//! Byte slice rendering for log output.

/// Wraps a byte slice so it renders according to the enabled `*-fmt` feature.
///
/// - `pretty-hex-fmt`: `[55 AA 55 AA]`
/// - `char-fmt`: printable ASCII as is, everything else as `\xNN`
/// - neither: the plain `Debug` output of the slice
pub(crate) struct Formatter<'a>(pub &'a [u8]);

impl core::fmt::Debug for Formatter<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        render(self.0, f)
    }
}

#[cfg(feature = "pretty-hex-fmt")]
fn render(bytes: &[u8], f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "[")?;

    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }

        write!(f, "{byte:02X}")?;
    }

    write!(f, "]")
}

#[cfg(all(feature = "char-fmt", not(feature = "pretty-hex-fmt")))]
fn render(bytes: &[u8], f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for byte in bytes {
        match byte {
            0x20..=0x7E => write!(f, "{}", *byte as char)?,
            _ => write!(f, "\\x{byte:02X}")?,
        }
    }

    Ok(())
}

#[cfg(not(any(feature = "char-fmt", feature = "pretty-hex-fmt")))]
fn render(bytes: &[u8], f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{bytes:?}")
}

#[cfg(feature = "defmt")]
impl defmt::Format for Formatter<'_> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=[u8]:x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::format;

    use super::*;

    #[test]
    #[cfg(all(feature = "char-fmt", not(feature = "pretty-hex-fmt")))]
    fn printable_bytes_render_as_chars() {
        let rendered = format!("{:?}", Formatter(&[b'o', b'k', 0x55, 0xAA, 0x1B]));

        assert_eq!(rendered, "okU\\xAA\\x1B");
    }

    #[test]
    #[cfg(feature = "pretty-hex-fmt")]
    fn bytes_render_as_hex() {
        let rendered = format!("{:?}", Formatter(&[0x55, 0xAA, 0x1B]));

        assert_eq!(rendered, "[55 AA 1B]");
    }
}
