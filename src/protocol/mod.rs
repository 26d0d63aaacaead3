//! # Call Layer
//!
//! Everything above raw values: typed record mapping, the call/reply envelope
//! and server-side dispatch.
//!
//! ## Components
//! - **Mapper**: Static field tables that turn records into objects and back
//! - **Envelope**: Call and reply framing, including faults
//! - **Dispatcher**: Method routing with fault replies for failures

pub mod dispatcher;
pub mod envelope;
pub mod mapper;
