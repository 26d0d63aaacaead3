//! # Hessian Codec
//!
//! A Hessian-style binary serialization codec: a closed [`Value`] model, a
//! tag-prefixed wire encoder/decoder with back-references, a static object
//! mapper for typed records, and the call/reply envelope used to invoke
//! remote methods.
//!
//! ## Layers
//! - [`core`]: values, packing, encoder, decoder and stream framing
//! - [`protocol`]: record mapping, envelopes and server-side dispatch
//! - [`service`]: the calling client and its [`Transport`] seam
//! - [`transport`]: Unix socket and in-memory stream transport
//! - [`utils`]: logging, metrics and hex dumps
//!
//! ## Example
//! ```rust
//! use hessian_codec::{decode, encode, Value};
//!
//! let value = Value::map(vec![(Value::from("id"), Value::int(7))]);
//! let bytes = encode(&value)?;
//! assert_eq!(bytes, b"MS\x00\x02idI\x00\x00\x00\x07z");
//! assert_eq!(decode(&bytes)?, value);
//! # Ok::<(), hessian_codec::HessianError>(())
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::core::decoder::{decode, decode_message, decode_with, Decoder};
pub use crate::core::encoder::{encode, encode_any, encode_with, Encoder};
pub use crate::core::observer::{Observer, TracingObserver};
pub use crate::core::value::{Object, Value};
pub use crate::error::{DecodeError, EncodeError, HessianError, Result};
pub use crate::protocol::dispatcher::Dispatcher;
pub use crate::protocol::envelope::{
    build_call_envelope, build_fault, build_reply, parse_call, parse_reply, Call, Reply,
};
pub use crate::protocol::mapper::{decode_record, encode_record, Field, Mapped};
pub use crate::service::client::{Client, Transport};
