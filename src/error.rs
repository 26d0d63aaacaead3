//! # Error Types
//!
//! Error handling for the Hessian codec and the call/reply layer built on it.
//!
//! Encoding and decoding each have their own error enum so that callers of the
//! pure codec only handle what can actually go wrong on that side. The
//! crate-wide [`HessianError`] wraps both, plus the failures that can only happen
//! once a transport is involved.
//!
//! ## Error Categories
//! - **Encode Errors**: unsupported runtime kinds, bad object descriptors, out-of-range lengths
//! - **Decode Errors**: malformed tags, truncated input, bad references
//! - **Call Errors**: remote faults, empty responses, unknown methods, timeouts
//! - **I/O Errors**: stream failures in the local transport
//!
//! ## Example Usage
//! ```rust
//! use hessian_codec::core::decoder::decode;
//! use hessian_codec::error::{DecodeError, HessianError, Result};
//!
//! fn first_value(bytes: &[u8]) -> Result<i32> {
//!     match decode(bytes)? {
//!         hessian_codec::core::value::Value::Int32(n) => Ok(n),
//!         _ => Err(HessianError::Custom("expected an int".to_string())),
//!     }
//! }
//!
//! assert!(matches!(
//!     first_value(b"I\x00\x00"),
//!     Err(HessianError::Decode(DecodeError::UnexpectedEof { .. }))
//! ));
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Client errors
    pub const ERR_EMPTY_RESPONSE: &str = "method or params error, response is empty";
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed before a reply arrived";

    /// Fault codes written into fault replies
    pub const FAULT_NO_SUCH_METHOD: &str = "NoSuchMethodException";
    pub const FAULT_PROTOCOL: &str = "ProtocolException";
    pub const FAULT_SERVICE: &str = "ServiceException";
}

/// Failures while turning a [`Value`](crate::core::value::Value) or a mapped
/// record into bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A runtime kind with no wire mapping.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// A record field whose kind is not in the supported set.
    #[error("unsupported field type {kind} for field {field}")]
    UnsupportedFieldType {
        /// Declared field name.
        field: String,
        /// Native kind that has no mapping.
        kind: String,
    },

    /// The record declares no reserved type field.
    #[error("object type not set: no `{0}` field declared")]
    MissingTypeField(&'static str),

    /// The reserved type field is not string-typed.
    #[error("type of `{0}` field is not a string")]
    InvalidTypeField(&'static str),

    /// A fixed-width pack was given a magnitude it cannot hold.
    #[error("{what} out of range: {value} (max {max})")]
    Range {
        /// What was being packed.
        what: &'static str,
        /// Offending value.
        value: u64,
        /// Largest representable value.
        max: u64,
    },
}

/// Failures while parsing bytes back into a [`Value`](crate::core::value::Value).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A tag byte with no valid interpretation at that position.
    #[error("malformed stream: unexpected tag 0x{tag:02x} at offset {offset}")]
    MalformedStream {
        /// Offending byte.
        tag: u8,
        /// Byte offset of the tag.
        offset: usize,
    },

    /// A read needed more bytes than remained.
    #[error("unexpected eof at offset {offset}, need {need} bytes, remaining {remaining}")]
    UnexpectedEof {
        /// Byte offset where the read was attempted.
        offset: usize,
        /// Requested bytes.
        need: usize,
        /// Bytes still available.
        remaining: usize,
    },

    /// String payload is not valid UTF-8.
    #[error("invalid utf-8 sequence at offset {offset}")]
    InvalidUtf8 {
        /// Byte offset of the bad sequence.
        offset: usize,
    },

    /// Back-reference to an index not yet in the reference table.
    #[error("invalid reference {index} (table holds {len})")]
    InvalidReference {
        /// Requested index.
        index: u32,
        /// Current table length.
        len: usize,
    },

    /// Back-references copied more string or binary data than the limit allows.
    #[error("back-references copied over {limit} bytes")]
    ReferenceLimitExceeded {
        /// Configured maximum.
        limit: usize,
    },

    /// Nesting deeper than the configured limit.
    #[error("nesting depth exceeds limit {0}")]
    DepthLimitExceeded(usize),

    /// Message larger than the configured limit.
    #[error("message of {size} bytes exceeds limit {limit}")]
    MessageTooLarge {
        /// Input length.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// Bytes left over after one complete message.
    #[error("trailing bytes after message at offset {offset}")]
    TrailingBytes {
        /// First unconsumed offset.
        offset: usize,
    },

    /// A decoded value does not fit the native field it is mapped to.
    #[error("field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Declared kind.
        expected: &'static str,
        /// Kind present on the wire.
        found: &'static str,
    },

    /// An object is missing a field the native type declares.
    #[error("missing field {0}")]
    MissingField(String),
}

/// HessianError is the primary error type for calls made through the crate.
#[derive(Error, Debug)]
pub enum HessianError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Remote fault {code}: {message}")]
    Fault { code: String, message: String },

    #[error("Empty response: {}", constants::ERR_EMPTY_RESPONSE)]
    EmptyResponse,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using HessianError
pub type Result<T> = std::result::Result<T, HessianError>;
