//! Fixed-width big-endian packing.
//!
//! Every multi-byte number on the wire is big-endian. Packing never partially
//! succeeds: either the full array is produced or an [`EncodeError::Range`] is
//! returned, and unpacking either consumes the full width or reports
//! [`DecodeError::UnexpectedEof`].

use crate::error::{DecodeError, EncodeError};

/// Maximum number of units (codepoints for strings, bytes for binaries) in one chunk.
pub const CHUNK_SIZE: usize = 0x8000;

/// Pack a length as a 2-byte big-endian unsigned integer.
pub fn pack_u16(n: usize) -> Result<[u8; 2], EncodeError> {
    let n = u16::try_from(n).map_err(|_| EncodeError::Range {
        what: "u16 length",
        value: n as u64,
        max: u16::MAX as u64,
    })?;
    Ok(n.to_be_bytes())
}

/// Pack a length as a single byte.
pub fn pack_u8(n: usize) -> Result<u8, EncodeError> {
    u8::try_from(n).map_err(|_| EncodeError::Range {
        what: "u8 length",
        value: n as u64,
        max: u8::MAX as u64,
    })
}

#[inline]
pub fn pack_i32(n: i32) -> [u8; 4] {
    n.to_be_bytes()
}

#[inline]
pub fn pack_i64(n: i64) -> [u8; 8] {
    n.to_be_bytes()
}

#[inline]
pub fn pack_f64(n: f64) -> [u8; 8] {
    n.to_be_bytes()
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], DecodeError> {
    bytes
        .get(..N)
        .and_then(|head| <[u8; N]>::try_from(head).ok())
        .ok_or(DecodeError::UnexpectedEof {
            offset: 0,
            need: N,
            remaining: bytes.len(),
        })
}

/// Read a 2-byte big-endian unsigned integer from the front of `bytes`.
pub fn unpack_u16(bytes: &[u8]) -> Result<u16, DecodeError> {
    fixed::<2>(bytes).map(u16::from_be_bytes)
}

pub fn unpack_i32(bytes: &[u8]) -> Result<i32, DecodeError> {
    fixed::<4>(bytes).map(i32::from_be_bytes)
}

pub fn unpack_i64(bytes: &[u8]) -> Result<i64, DecodeError> {
    fixed::<8>(bytes).map(i64::from_be_bytes)
}

pub fn unpack_f64(bytes: &[u8]) -> Result<f64, DecodeError> {
    fixed::<8>(bytes).map(f64::from_be_bytes)
}
