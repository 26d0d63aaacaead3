//! # Decoder
//!
//! Single-pass, tag-driven parser from bytes back to [`Value`].
//!
//! Each decode call owns a private [reference table](crate::core::refs) that is
//! discarded when the call returns. Failures never yield a partial value: a read
//! past the end of input is always [`DecodeError::UnexpectedEof`], and a tag with
//! no meaning at its position is [`DecodeError::MalformedStream`].
//!
//! Work stays proportional to input size. Map keys are deduplicated through a
//! hash index, and string or binary data copied out by back-references may not
//! exceed `max_message_size` in total. When a string chunk or list announces more
//! items than there are bytes left, the EOF reports that lower bound as `need`,
//! which lets stream framing wait for the whole frame instead of re-parsing.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::config::CodecConfig;
use crate::core::encoder::FIELD_COUNT_BIAS;
use crate::core::observer::Observer;
use crate::core::packing::{unpack_f64, unpack_i32, unpack_i64, unpack_u16};
use crate::core::refs::{RefTable, REF_TAG};
use crate::core::value::{Object, Value};
use crate::error::DecodeError;

/// Cursor over one message.
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
    refs: RefTable,
    copied: usize,
    max_copied: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, &CodecConfig::default())
    }

    pub fn with_config(input: &'a [u8], config: &CodecConfig) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            max_depth: config.max_depth,
            refs: RefTable::new(),
            copied: 0,
            max_copied: config.max_message_size,
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.input.len()
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes { offset: self.pos })
        }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                need: n,
                remaining,
            });
        }
        let slice = &self.input[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof {
                offset: self.pos,
                need: 1,
                remaining: 0,
            })
    }

    /// Consume `tag` or fail with `MalformedStream`.
    pub fn expect(&mut self, tag: u8) -> Result<(), DecodeError> {
        let offset = self.pos;
        let found = self.read_u8()?;
        if found == tag {
            Ok(())
        } else {
            Err(DecodeError::MalformedStream { tag: found, offset })
        }
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        unpack_u16(self.take(2)?)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        unpack_i32(self.take(4)?)
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        unpack_i64(self.take(8)?)
    }

    /// Read `len` bytes that must form valid UTF-8.
    pub fn read_utf8_bytes(&mut self, len: usize) -> Result<&'a str, DecodeError> {
        let offset = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
            offset: offset + e.valid_up_to(),
        })
    }

    /// Decode the next value.
    pub fn read_value(&mut self) -> Result<Value, DecodeError> {
        let offset = self.pos;
        let tag = self.read_u8()?;
        match tag {
            b'N' => Ok(Value::Null),
            b'T' => Ok(Value::Bool(true)),
            b'F' => Ok(Value::Bool(false)),
            b'I' => self.read_i32().map(Value::Int32),
            b'L' => self.read_i64().map(Value::Int64),
            b'D' => unpack_f64(self.take(8)?).map(Value::Float64),
            b'd' => self.read_i64().map(Value::DateTimeMillis),
            b'S' | b's' => self.read_string(tag),
            b'B' | b'b' => self.read_binary(tag),
            b'V' => self.nested(Self::read_list),
            b'M' => self.nested(Self::read_map),
            b'C' => self.nested(Self::read_object),
            REF_TAG => self.read_reference(),
            _ => Err(DecodeError::MalformedStream { tag, offset }),
        }
    }

    fn nested(
        &mut self,
        read: fn(&mut Self) -> Result<Value, DecodeError>,
    ) -> Result<Value, DecodeError> {
        if self.depth >= self.max_depth {
            return Err(DecodeError::DepthLimitExceeded(self.max_depth));
        }
        self.depth += 1;
        let value = read(self)?;
        self.depth -= 1;
        self.refs.register(&value);
        Ok(value)
    }

    /// Fail with EOF when fewer than `need` bytes remain.
    fn ensure(&self, need: usize) -> Result<(), DecodeError> {
        let remaining = self.remaining();
        if need > remaining {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                need,
                remaining,
            });
        }
        Ok(())
    }

    /// Read `count` codepoints of UTF-8.
    fn read_codepoints(&mut self, count: usize) -> Result<&'a str, DecodeError> {
        let start = self.pos;
        for done in 0..count {
            // Every codepoint still to come takes at least one byte.
            let rest = count - done - 1;
            self.ensure(1 + rest)?;
            let width = match self.input[self.pos] {
                0x00..=0x7F => 1,
                0xC0..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF7 => 4,
                _ => return Err(DecodeError::InvalidUtf8 { offset: self.pos }),
            };
            self.ensure(width + rest)?;
            self.pos += width;
        }
        std::str::from_utf8(&self.input[start..self.pos]).map_err(|e| DecodeError::InvalidUtf8 {
            offset: start + e.valid_up_to(),
        })
    }

    fn read_string(&mut self, first_tag: u8) -> Result<Value, DecodeError> {
        let mut tag = first_tag;
        let mut out = String::new();
        loop {
            let count = self.read_u16()? as usize;
            out.push_str(self.read_codepoints(count)?);
            if tag == b'S' {
                break;
            }
            let offset = self.pos;
            tag = self.read_u8()?;
            if tag != b's' && tag != b'S' {
                return Err(DecodeError::MalformedStream { tag, offset });
            }
        }
        let value = Value::Str(out);
        self.refs.register(&value);
        Ok(value)
    }

    fn read_binary(&mut self, first_tag: u8) -> Result<Value, DecodeError> {
        let mut tag = first_tag;
        let mut out = Vec::new();
        loop {
            let len = self.read_u16()? as usize;
            out.extend_from_slice(self.take(len)?);
            if tag == b'B' {
                break;
            }
            let offset = self.pos;
            tag = self.read_u8()?;
            if tag != b'b' && tag != b'B' {
                return Err(DecodeError::MalformedStream { tag, offset });
            }
        }
        let value = Value::Bytes(out);
        self.refs.register(&value);
        Ok(value)
    }

    fn read_list(&mut self) -> Result<Value, DecodeError> {
        self.expect(b'l')?;
        let offset = self.pos;
        let count = self.read_i32()?;
        let count = usize::try_from(count)
            .map_err(|_| DecodeError::MalformedStream { tag: b'l', offset })?;

        // Every element takes at least one byte, then the terminator.
        self.ensure(count.saturating_add(1))?;
        let mut items = Vec::with_capacity(count);
        for done in 0..count {
            let item = self
                .read_value()
                .map_err(|e| needing_more(e, count - done))?;
            items.push(item);
        }
        self.expect(b'z')?;
        Ok(Value::list(items))
    }

    fn read_map(&mut self) -> Result<Value, DecodeError> {
        let hasher = RandomState::new();
        let mut pairs: Vec<(Value, Value)> = Vec::new();
        let mut index: HashMap<u64, Vec<usize>> = HashMap::new();
        while self.peek_u8()? != b'z' {
            let key = self.read_value()?;
            let value = self.read_value()?;
            // Duplicate keys: last write wins, first position kept.
            let slots = index.entry(hasher.hash_one(MapKey(&key))).or_default();
            match slots.iter().copied().find(|&i| pairs[i].0 == key) {
                Some(i) => pairs[i].1 = value,
                None => {
                    slots.push(pairs.len());
                    pairs.push((key, value));
                }
            }
        }
        self.expect(b'z')?;
        Ok(Value::map(pairs))
    }

    fn read_object(&mut self) -> Result<Value, DecodeError> {
        let type_len = self.read_u8()? as usize;
        let type_name = self.read_utf8_bytes(type_len)?.to_owned();

        let offset = self.pos;
        let header = self.read_u16()? as usize;
        let count = header
            .checked_sub(FIELD_COUNT_BIAS)
            .ok_or(DecodeError::MalformedStream {
                tag: self.input[offset],
                offset,
            })?;

        let mut names = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            let offset = self.pos;
            match self.read_value()? {
                Value::Str(name) => names.push(name),
                _ => {
                    return Err(DecodeError::MalformedStream {
                        tag: self.input[offset],
                        offset,
                    })
                }
            }
        }

        self.expect(b'O')?;
        let mut fields = Vec::with_capacity(count);
        for name in names {
            let value = self.read_value()?;
            fields.push((name, value));
        }
        Ok(Value::object(Object { type_name, fields }))
    }

    fn read_reference(&mut self) -> Result<Value, DecodeError> {
        let offset = self.pos;
        let index = self.read_i32()?;
        let index =
            u32::try_from(index).map_err(|_| DecodeError::MalformedStream { tag: REF_TAG, offset })?;
        let value = self.refs.resolve(index)?;
        self.copied = self.copied.saturating_add(RefTable::copy_cost(value));
        if self.copied > self.max_copied {
            return Err(DecodeError::ReferenceLimitExceeded {
                limit: self.max_copied,
            });
        }
        Ok(value.clone())
    }
}

/// Add `more` bytes known to follow the failed read to an EOF's `need`.
fn needing_more(error: DecodeError, more: usize) -> DecodeError {
    match error {
        DecodeError::UnexpectedEof {
            offset,
            need,
            remaining,
        } => DecodeError::UnexpectedEof {
            offset,
            need: need.saturating_add(more),
            remaining,
        },
        other => other,
    }
}

/// Hashes a map key consistently with `Value`'s `PartialEq`.
struct MapKey<'v>(&'v Value);

impl Hash for MapKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(self.0, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Int32(n) => n.hash(state),
        Value::Int64(n) | Value::DateTimeMillis(n) => n.hash(state),
        // 0.0 == -0.0, so both hash alike. NaN never equals itself and may hash anywhere.
        Value::Float64(n) => {
            let n = if *n == 0.0 { 0.0 } else { *n };
            n.to_bits().hash(state)
        }
        Value::Str(s) => s.hash(state),
        Value::Bytes(b) => b.hash(state),
        Value::List(items) => {
            items.len().hash(state);
            for item in items.iter() {
                hash_value(item, state);
            }
        }
        Value::Map(pairs) => {
            pairs.len().hash(state);
            for (k, v) in pairs.iter() {
                hash_value(k, state);
                hash_value(v, state);
            }
        }
        Value::Object(object) => {
            object.type_name.hash(state);
            object.fields.len().hash(state);
            for (name, v) in &object.fields {
                name.hash(state);
                hash_value(v, state);
            }
        }
    }
}

/// Decode one self-contained message; every input byte must be consumed.
pub fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    decode_message(bytes, &CodecConfig::default())
}

/// Decode one message under explicit limits.
pub fn decode_message(bytes: &[u8], config: &CodecConfig) -> Result<Value, DecodeError> {
    if bytes.len() > config.max_message_size {
        return Err(DecodeError::MessageTooLarge {
            size: bytes.len(),
            limit: config.max_message_size,
        });
    }
    let mut decoder = Decoder::with_config(bytes, config);
    let value = decoder.read_value()?;
    decoder.finish()?;
    Ok(value)
}

/// Decode one message, reporting the outcome to `observer`.
pub fn decode_with(
    bytes: &[u8],
    config: &CodecConfig,
    observer: &dyn Observer,
) -> Result<Value, DecodeError> {
    match decode_message(bytes, config) {
        Ok(value) => {
            observer.decoded(&value, bytes);
            Ok(value)
        }
        Err(e) => {
            observer.decode_failed(&e, bytes);
            Err(e)
        }
    }
}
