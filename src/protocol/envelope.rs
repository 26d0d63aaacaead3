//! # Call and Reply Envelopes
//!
//! The only framing the codec owns: a method call wrapped around encoded
//! parameters, and the reply wrapped around a result or fault.
//!
//! ## Wire Format
//! ```text
//! call   c 0x00 0x01 m [u16 len] method-bytes param* z
//! reply  r 0x01 0x00 value z
//! fault  r 0x01 0x00 f (string value)* z
//! ```
//!
//! A response that does not start with `r` is read as a bare value.

use crate::config::CodecConfig;
use crate::core::decoder::Decoder;
use crate::core::encoder::Encoder;
use crate::core::observer::Observer;
use crate::core::packing::pack_u16;
use crate::core::value::Value;
use crate::error::{DecodeError, EncodeError};

/// Fixed call preamble.
pub const CALL_PREAMBLE: [u8; 4] = [b'c', 0x00, 0x01, b'm'];

/// Fixed reply preamble.
pub const REPLY_PREAMBLE: [u8; 3] = [b'r', 0x01, 0x00];

const FAULT_TAG: u8 = b'f';
const END_TAG: u8 = b'z';

/// A decoded method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub params: Vec<Value>,
}

impl Call {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(Value),
    Fault { code: String, message: String },
}

/// Frame a call: preamble, method name, each parameter in order, terminator.
pub fn build_call_envelope(method: &str, params: &[Value]) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new();
    write_call(&mut encoder, method, params)?;
    Ok(encoder.into_vec())
}

/// [`build_call_envelope`] with an observer told about each parameter.
pub fn build_call_envelope_with(
    method: &str,
    params: &[Value],
    observer: &dyn Observer,
) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new().with_observer(observer);
    write_call(&mut encoder, method, params)?;
    Ok(encoder.into_vec())
}

pub(crate) fn write_call(
    encoder: &mut Encoder<'_>,
    method: &str,
    params: &[Value],
) -> Result<(), EncodeError> {
    let method_len = pack_u16(method.len())?;
    encoder.put_raw(&CALL_PREAMBLE);
    encoder.put_raw(&method_len);
    encoder.put_raw(method.as_bytes());
    for param in params {
        encoder.write(param)?;
    }
    encoder.put_raw(&[END_TAG]);
    Ok(())
}

/// Frame a successful reply.
pub fn build_reply(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new();
    write_reply(&mut encoder, &Reply::Value(value.clone()))?;
    Ok(encoder.into_vec())
}

/// Frame a fault reply.
pub fn build_fault(code: &str, message: &str) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new();
    write_reply(
        &mut encoder,
        &Reply::Fault {
            code: code.to_string(),
            message: message.to_string(),
        },
    )?;
    Ok(encoder.into_vec())
}

pub(crate) fn write_reply(encoder: &mut Encoder<'_>, reply: &Reply) -> Result<(), EncodeError> {
    encoder.put_raw(&REPLY_PREAMBLE);
    match reply {
        Reply::Value(value) => encoder.write(value)?,
        Reply::Fault { code, message } => {
            encoder.put_raw(&[FAULT_TAG]);
            encoder.write(&Value::from("code"))?;
            encoder.write(&Value::from(code.as_str()))?;
            encoder.write(&Value::from("message"))?;
            encoder.write(&Value::from(message.as_str()))?;
        }
    }
    encoder.put_raw(&[END_TAG]);
    Ok(())
}

/// Read one call envelope from the decoder's current position.
pub fn read_call(decoder: &mut Decoder<'_>) -> Result<Call, DecodeError> {
    for tag in CALL_PREAMBLE {
        decoder.expect(tag)?;
    }
    let method_len = decoder.read_u16()? as usize;
    let method = decoder.read_utf8_bytes(method_len)?.to_owned();

    let mut params = Vec::new();
    while decoder.peek_u8()? != END_TAG {
        params.push(decoder.read_value()?);
    }
    decoder.expect(END_TAG)?;
    Ok(Call { method, params })
}

/// Parse a complete call message.
pub fn parse_call(bytes: &[u8], config: &CodecConfig) -> Result<Call, DecodeError> {
    check_size(bytes, config)?;
    let mut decoder = Decoder::with_config(bytes, config);
    let call = read_call(&mut decoder)?;
    decoder.finish()?;
    Ok(call)
}

/// Read one enveloped reply from the decoder's current position.
pub fn read_reply(decoder: &mut Decoder<'_>) -> Result<Reply, DecodeError> {
    for tag in REPLY_PREAMBLE {
        decoder.expect(tag)?;
    }
    let reply = if decoder.peek_u8()? == FAULT_TAG {
        decoder.expect(FAULT_TAG)?;
        read_fault_body(decoder)?
    } else {
        Reply::Value(decoder.read_value()?)
    };
    decoder.expect(END_TAG)?;
    Ok(reply)
}

fn read_fault_body(decoder: &mut Decoder<'_>) -> Result<Reply, DecodeError> {
    let mut code = String::new();
    let mut message = String::new();
    while decoder.peek_u8()? != END_TAG {
        let offset = decoder.position();
        let tag = decoder.peek_u8()?;
        let key = decoder.read_value()?;
        let value = decoder.read_value()?;
        match (key.as_str(), value) {
            (Some("code"), Value::Str(v)) => code = v,
            (Some("message"), Value::Str(v)) => message = v,
            (Some(_), _) => {}
            (None, _) => return Err(DecodeError::MalformedStream { tag, offset }),
        }
    }
    Ok(Reply::Fault { code, message })
}

/// Parse a complete response: an enveloped reply, or a bare value.
pub fn parse_reply(bytes: &[u8], config: &CodecConfig) -> Result<Reply, DecodeError> {
    check_size(bytes, config)?;
    let mut decoder = Decoder::with_config(bytes, config);
    let reply = if decoder.peek_u8()? == REPLY_PREAMBLE[0] {
        read_reply(&mut decoder)?
    } else {
        Reply::Value(decoder.read_value()?)
    };
    decoder.finish()?;
    Ok(reply)
}

fn check_size(bytes: &[u8], config: &CodecConfig) -> Result<(), DecodeError> {
    if bytes.len() > config.max_message_size {
        return Err(DecodeError::MessageTooLarge {
            size: bytes.len(),
            limit: config.max_message_size,
        });
    }
    Ok(())
}
