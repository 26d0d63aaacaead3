//! # Encoder
//!
//! Serializes a [`Value`] into its canonical byte sequence.
//!
//! ## Wire Format
//! ```text
//! N                      null
//! T | F                  bool
//! I [i32]                int
//! L [i64]                long
//! D [f64]                double
//! d [i64 millis]         date
//! (s [u16] utf8)* S [u16] utf8      string, length in codepoints
//! (b [u16] bytes)* B [u16] bytes    binary, length in bytes
//! V l [i32 count] value* z          list
//! M (key value)* z                  map
//! C [u8 len] type [u16 0x90+n] name{n} O value{n}   object
//! ```
//!
//! Strings and binaries longer than [`CHUNK_SIZE`] units are split into
//! non-final chunks of exactly `CHUNK_SIZE` units followed by one final chunk.

use bytes::{BufMut, BytesMut};
use std::any::Any;
use std::time::SystemTime;

use crate::core::observer::Observer;
use crate::core::packing::{pack_f64, pack_i32, pack_i64, pack_u16, pack_u8, CHUNK_SIZE};
use crate::core::value::{Object, Value};
use crate::error::EncodeError;

/// Bias added to the field count in an object definition header.
pub const FIELD_COUNT_BIAS: usize = 0x90;

/// Default capacity for a fresh output buffer.
const DEFAULT_CAPACITY: usize = 256;

/// Stateful writer that appends encoded values to an owned buffer.
///
/// An `Encoder` can write several values back to back, which is how call
/// envelopes are assembled. A value that fails to encode leaves no bytes
/// behind; everything written before it is kept.
pub struct Encoder<'o> {
    buf: BytesMut,
    observer: Option<&'o dyn Observer>,
}

impl Default for Encoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'o> Encoder<'o> {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(DEFAULT_CAPACITY),
            observer: None,
        }
    }

    /// Attach an observer that is told about every top-level value written.
    pub fn with_observer(mut self, observer: &'o dyn Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Append raw bytes that are not a value (envelope framing).
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Encode one top-level value onto the end of the buffer.
    pub fn write(&mut self, value: &Value) -> Result<(), EncodeError> {
        let start = self.buf.len();
        match self.write_value(value) {
            Ok(()) => {
                if let Some(observer) = self.observer {
                    observer.encoded(value, &self.buf[start..]);
                }
                Ok(())
            }
            Err(e) => {
                self.buf.truncate(start);
                if let Some(observer) = self.observer {
                    observer.encode_failed(&e);
                }
                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the encoder and return the bytes written so far.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Consume the encoder, returning the underlying buffer without copying.
    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    fn write_value(&mut self, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Null => self.buf.put_u8(b'N'),
            Value::Bool(true) => self.buf.put_u8(b'T'),
            Value::Bool(false) => self.buf.put_u8(b'F'),
            Value::Int32(n) => {
                self.buf.put_u8(b'I');
                self.buf.put_slice(&pack_i32(*n));
            }
            Value::Int64(n) => {
                self.buf.put_u8(b'L');
                self.buf.put_slice(&pack_i64(*n));
            }
            Value::Float64(n) => {
                self.buf.put_u8(b'D');
                self.buf.put_slice(&pack_f64(*n));
            }
            Value::DateTimeMillis(ms) => {
                self.buf.put_u8(b'd');
                self.buf.put_slice(&pack_i64(*ms));
            }
            Value::Str(s) => self.write_string(s)?,
            Value::Bytes(b) => self.write_binary(b)?,
            Value::List(items) => self.write_list(items)?,
            Value::Map(pairs) => self.write_map(pairs)?,
            Value::Object(object) => self.write_object(object)?,
        }
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<(), EncodeError> {
        let mut rest = s;
        let mut remaining = s.chars().count();

        while remaining > CHUNK_SIZE {
            // Byte offset just past the CHUNK_SIZE-th codepoint.
            let split = rest
                .char_indices()
                .nth(CHUNK_SIZE)
                .map_or(rest.len(), |(i, _)| i);
            let (chunk, tail) = rest.split_at(split);
            self.buf.put_u8(b's');
            self.buf.put_slice(&pack_u16(CHUNK_SIZE)?);
            self.buf.put_slice(chunk.as_bytes());
            rest = tail;
            remaining -= CHUNK_SIZE;
        }

        self.buf.put_u8(b'S');
        self.buf.put_slice(&pack_u16(remaining)?);
        self.buf.put_slice(rest.as_bytes());
        Ok(())
    }

    fn write_binary(&mut self, b: &[u8]) -> Result<(), EncodeError> {
        let mut rest = b;

        while rest.len() > CHUNK_SIZE {
            let (chunk, tail) = rest.split_at(CHUNK_SIZE);
            self.buf.put_u8(b'b');
            self.buf.put_slice(&pack_u16(CHUNK_SIZE)?);
            self.buf.put_slice(chunk);
            rest = tail;
        }

        self.buf.put_u8(b'B');
        self.buf.put_slice(&pack_u16(rest.len())?);
        self.buf.put_slice(rest);
        Ok(())
    }

    fn write_list(&mut self, items: &[Value]) -> Result<(), EncodeError> {
        let count = i32::try_from(items.len()).map_err(|_| EncodeError::Range {
            what: "list length",
            value: items.len() as u64,
            max: i32::MAX as u64,
        })?;

        self.buf.put_u8(b'V');
        self.buf.put_u8(b'l');
        self.buf.put_slice(&pack_i32(count));
        for item in items {
            self.write_value(item)?;
        }
        self.buf.put_u8(b'z');
        Ok(())
    }

    fn write_map(&mut self, pairs: &[(Value, Value)]) -> Result<(), EncodeError> {
        self.buf.put_u8(b'M');
        for (key, value) in pairs {
            self.write_value(key)?;
            self.write_value(value)?;
        }
        self.buf.put_u8(b'z');
        Ok(())
    }

    fn write_object(&mut self, object: &Object) -> Result<(), EncodeError> {
        let type_len = pack_u8(object.type_name.len())?;
        let header = pack_u16(FIELD_COUNT_BIAS + object.fields.len())?;

        self.buf.put_u8(b'C');
        self.buf.put_u8(type_len);
        self.buf.put_slice(object.type_name.as_bytes());
        self.buf.put_slice(&header);

        // Names and values are written from the same slice so their order can't drift.
        for (name, _) in &object.fields {
            self.write_string(name)?;
        }
        self.buf.put_u8(b'O');
        for (_, value) in &object.fields {
            self.write_value(value)?;
        }
        Ok(())
    }
}

/// Encode a single value into a fresh byte vector.
pub fn encode(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new();
    encoder.write(value)?;
    Ok(encoder.into_vec())
}

/// Encode a single value, reporting to `observer`.
pub fn encode_with(value: &Value, observer: &dyn Observer) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new().with_observer(observer);
    encoder.write(value)?;
    Ok(encoder.into_vec())
}

/// Map a dynamically typed native value onto the value model by its runtime kind.
///
/// Native `isize` takes the range-routed integer encoding; fixed-width integers
/// keep their width. Anything without a wire mapping is rejected.
pub fn value_from_any<T: Any>(native: &T) -> Result<Value, EncodeError> {
    let any = native as &dyn Any;
    if let Some(v) = any.downcast_ref::<Value>() {
        return Ok(v.clone());
    }
    if any.is::<()>() {
        return Ok(Value::Null);
    }
    if let Some(v) = any.downcast_ref::<bool>() {
        return Ok(Value::Bool(*v));
    }
    if let Some(v) = any.downcast_ref::<isize>() {
        return Ok(Value::int(*v as i64));
    }
    if let Some(v) = any.downcast_ref::<i32>() {
        return Ok(Value::Int32(*v));
    }
    if let Some(v) = any.downcast_ref::<i64>() {
        return Ok(Value::Int64(*v));
    }
    if let Some(v) = any.downcast_ref::<f64>() {
        return Ok(Value::Float64(*v));
    }
    if let Some(v) = any.downcast_ref::<String>() {
        return Ok(Value::Str(v.clone()));
    }
    if let Some(v) = any.downcast_ref::<&str>() {
        return Ok(Value::Str((*v).to_owned()));
    }
    if let Some(v) = any.downcast_ref::<Vec<u8>>() {
        return Ok(Value::Bytes(v.clone()));
    }
    if let Some(v) = any.downcast_ref::<Vec<Value>>() {
        return Ok(Value::list(v.clone()));
    }
    if let Some(v) = any.downcast_ref::<SystemTime>() {
        return Ok(Value::date(*v));
    }
    Err(EncodeError::UnsupportedType(
        std::any::type_name::<T>().to_string(),
    ))
}

/// Encode a dynamically typed native value.
pub fn encode_any<T: Any>(native: &T) -> Result<Vec<u8>, EncodeError> {
    encode(&value_from_any(native)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_scalars() {
        assert_eq!(encode(&Value::Null).unwrap(), b"N");
        assert_eq!(encode(&Value::Bool(true)).unwrap(), b"T");
        assert_eq!(encode(&Value::Bool(false)).unwrap(), b"F");
        assert_eq!(encode(&Value::Int32(1)).unwrap(), b"I\x00\x00\x00\x01");
        assert_eq!(
            encode(&Value::Int64(-1)).unwrap(),
            b"L\xff\xff\xff\xff\xff\xff\xff\xff"
        );
        assert_eq!(
            encode(&Value::Float64(1.0)).unwrap(),
            b"D\x3f\xf0\x00\x00\x00\x00\x00\x00"
        );
        assert_eq!(
            encode(&Value::DateTimeMillis(256)).unwrap(),
            b"d\x00\x00\x00\x00\x00\x00\x01\x00"
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_string_length_counts_codepoints() {
        // 2 codepoints, 5 bytes
        let bytes = encode(&Value::from("é😀")).unwrap();
        assert_eq!(&bytes[..3], b"S\x00\x02");
        assert_eq!(&bytes[3..], "é😀".as_bytes());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_empty_string_and_binary() {
        assert_eq!(encode(&Value::from("")).unwrap(), b"S\x00\x00");
        assert_eq!(encode(&Value::Bytes(vec![])).unwrap(), b"B\x00\x00");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_multibyte_string_chunks_on_codepoints() {
        let s = "é".repeat(CHUNK_SIZE + 2);
        let bytes = encode(&Value::Str(s)).unwrap();
        assert_eq!(&bytes[..3], b"s\x80\x00");
        // Non-final chunk carries CHUNK_SIZE codepoints of 2 bytes each.
        let final_at = 3 + CHUNK_SIZE * 2;
        assert_eq!(&bytes[final_at..final_at + 3], b"S\x00\x02");
        assert_eq!(bytes.len(), final_at + 3 + 4);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_binary_chunking() {
        let bytes = encode(&Value::Bytes(vec![7u8; CHUNK_SIZE * 2 + 3])).unwrap();
        assert_eq!(&bytes[..3], b"b\x80\x00");
        let second = 3 + CHUNK_SIZE;
        assert_eq!(&bytes[second..second + 3], b"b\x80\x00");
        let last = second + 3 + CHUNK_SIZE;
        assert_eq!(&bytes[last..last + 3], b"B\x00\x03");
        assert_eq!(bytes.len(), last + 3 + 3);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_list_and_map_framing() {
        let list = Value::list(vec![Value::Null, Value::Bool(true)]);
        assert_eq!(encode(&list).unwrap(), b"Vl\x00\x00\x00\x02NTz");

        let map = Value::map(vec![(Value::from("a"), Value::Int32(1))]);
        assert_eq!(encode(&map).unwrap(), b"MS\x00\x01aI\x00\x00\x00\x01z");
    }

    #[test]
    fn test_type_name_too_long() {
        let object = Object::new("x".repeat(256));
        assert!(matches!(
            encode(&Value::object(object)),
            Err(EncodeError::Range { what: "u8 length", .. })
        ));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_encoder_writes_back_to_back() {
        let mut enc = Encoder::new();
        enc.put_raw(b"<");
        enc.write(&Value::Int32(0)).unwrap();
        enc.write(&Value::Null).unwrap();
        assert_eq!(enc.len(), 7);
        assert_eq!(enc.into_vec(), b"<I\x00\x00\x00\x00N");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_value_from_any_dispatch() {
        assert_eq!(value_from_any(&3_000_000_000isize).unwrap(), Value::Int64(3_000_000_000));
        assert_eq!(value_from_any(&5isize).unwrap(), Value::Int32(5));
        assert_eq!(value_from_any(&()).unwrap(), Value::Null);
        assert_eq!(value_from_any(&"hi").unwrap(), Value::from("hi"));
        assert_eq!(encode_any(&true).unwrap(), b"T");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_value_from_any_rejects_unknown_kind() {
        let err = value_from_any(&'c').unwrap_err();
        assert_eq!(err, EncodeError::UnsupportedType("char".to_string()));
        assert!(matches!(encode_any(&1u8), Err(EncodeError::UnsupportedType(_))));
    }
}
