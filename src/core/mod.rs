//! # Core Codec Components
//!
//! Value model, binary encoder/decoder and stream framing.
//!
//! ## Components
//! - **Value**: The tagged union every encode/decode call works on
//! - **Encoder / Decoder**: Hessian-style tag-prefixed wire format
//! - **Refs**: Per-decode back-reference table
//! - **Codec**: Tokio codecs for framing envelopes over byte streams
//! - **Observer**: Hook for logging and metrics around each operation
//!
//! ## Wire Format
//! ```text
//! [Tag(1)] [Payload(N)]
//! ```
//! Multi-byte integers are big-endian. Strings and binaries longer than
//! [`packing::CHUNK_SIZE`] are split into continuation chunks.
//!
//! ## Security
//! - Maximum message size: 16MB (configurable)
//! - Nesting depth limit: 128 (configurable)
//! - Element counts never drive an allocation larger than the remaining input

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod observer;
pub mod packing;
pub(crate) mod refs;
pub mod value;
