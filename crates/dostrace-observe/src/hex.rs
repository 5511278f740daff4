//! Hex byte rendering.

use std::fmt::{self, Write};

/// Write bytes as space-separated uppercase hex pairs (`"B8 00 4C"`).
pub fn write_hex_bytes<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.write_char(' ')?;
        }
        write!(out, "{:02X}", byte)?;
    }
    Ok(())
}

/// Hex rendering of a fixed-size byte window, padded on the right to
/// `width` characters.
///
/// Used for the instruction byte column, which stays aligned across lines.
pub struct PaddedHex<'a> {
    bytes: &'a [u8],
    width: usize,
}

impl<'a> PaddedHex<'a> {
    /// Render `bytes` padded to `width`.
    pub fn new(bytes: &'a [u8], width: usize) -> Self {
        Self { bytes, width }
    }
}

impl fmt::Display for PaddedHex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex_bytes(f, self.bytes)?;
        let rendered = (self.bytes.len() * 3).saturating_sub(1);
        for _ in rendered..self.width {
            f.write_char(' ')?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_bytes_no_trailing_space() {
        let mut out = String::new();
        write_hex_bytes(&mut out, &[0xB8, 0x00, 0x4C]).unwrap();
        assert_eq!(out, "B8 00 4C");
    }

    #[test]
    fn test_hex_bytes_empty() {
        let mut out = String::new();
        write_hex_bytes(&mut out, &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_padded_hex() {
        let full = PaddedHex::new(&[0xCD, 0x21, 0xB4, 0x4C, 0xCD, 0x21, 0x90, 0x90], 23).to_string();
        assert_eq!(full, "CD 21 B4 4C CD 21 90 90");
        assert_eq!(full.len(), 23);

        let short = PaddedHex::new(&[0xC3], 23).to_string();
        assert_eq!(short.len(), 23);
        assert!(short.starts_with("C3 "));
    }
}
