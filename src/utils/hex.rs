//! Hex dump formatting for debug output.

use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;

/// Render bytes as rows of 16 space-separated hex pairs, prefixed by the row offset.
///
/// ```rust
/// use hessian_codec::utils::hex::sprint_hex;
///
/// assert_eq!(sprint_hex(b"N"), "0000: 4e");
/// ```
pub fn sprint_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3 + bytes.len() / BYTES_PER_LINE * 7);
    for (row, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:04x}:", row * BYTES_PER_LINE);
        for b in chunk {
            let _ = write!(out, " {b:02x}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(sprint_hex(&[]), "");
    }

    #[test]
    fn test_wraps_rows() {
        let bytes: Vec<u8> = (0..18).collect();
        let dump = sprint_hex(&bytes);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000: 00 01 02"));
        assert_eq!(lines[1], "0010: 10 11");
    }
}
