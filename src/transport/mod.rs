//! # Transport Layer
//!
//! Byte-stream carriers for call and reply envelopes.
//!
//! ## Components
//! - **Local**: Unix domain sockets and in-memory streams framed with the
//!   stream codecs from [`core::codec`](crate::core::codec)

pub mod local;

pub use local::{serve_stream, StreamTransport};
