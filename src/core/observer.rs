//! Observability hook for encode/decode.
//!
//! The codec never logs on its own. Callers that want visibility pass an
//! [`Observer`] to [`Encoder::with_observer`](crate::core::encoder::Encoder::with_observer)
//! or [`decode_with`](crate::core::decoder::decode_with); the hook sees each
//! top-level value together with its bytes, and every failure.

use tracing::{debug, warn};

use crate::core::value::Value;
use crate::error::{DecodeError, EncodeError};
use crate::utils::hex::sprint_hex;

/// Callbacks invoked by the encoder and decoder. All methods default to no-ops.
pub trait Observer: Send + Sync {
    fn encoded(&self, _value: &Value, _bytes: &[u8]) {}

    fn encode_failed(&self, _error: &EncodeError) {}

    fn decoded(&self, _value: &Value, _bytes: &[u8]) {}

    fn decode_failed(&self, _error: &DecodeError, _bytes: &[u8]) {}

    /// A call envelope is about to be handed to a transport.
    fn call_sent(&self, _method: &str, _body: &[u8]) {}

    /// A fault reply was received or produced.
    fn fault(&self, _code: &str, _message: &str) {}
}

/// Emits a `tracing` event with a hex dump of every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn encoded(&self, value: &Value, bytes: &[u8]) {
        debug!(kind = value.kind_name(), len = bytes.len(), "encoded\n{}", sprint_hex(bytes));
    }

    fn encode_failed(&self, error: &EncodeError) {
        warn!(error = %error, "encode failed");
    }

    fn decoded(&self, value: &Value, bytes: &[u8]) {
        debug!(kind = value.kind_name(), len = bytes.len(), "decoded\n{}", sprint_hex(bytes));
    }

    fn decode_failed(&self, error: &DecodeError, bytes: &[u8]) {
        warn!(error = %error, len = bytes.len(), "decode failed");
    }

    fn call_sent(&self, method: &str, body: &[u8]) {
        debug!(method, len = body.len(), "call\n{}", sprint_hex(body));
    }

    fn fault(&self, code: &str, message: &str) {
        warn!(code, message, "fault");
    }
}

/// Fans one event out to several observers.
impl<A: Observer, B: Observer> Observer for (A, B) {
    fn encoded(&self, value: &Value, bytes: &[u8]) {
        self.0.encoded(value, bytes);
        self.1.encoded(value, bytes);
    }

    fn encode_failed(&self, error: &EncodeError) {
        self.0.encode_failed(error);
        self.1.encode_failed(error);
    }

    fn decoded(&self, value: &Value, bytes: &[u8]) {
        self.0.decoded(value, bytes);
        self.1.decoded(value, bytes);
    }

    fn decode_failed(&self, error: &DecodeError, bytes: &[u8]) {
        self.0.decode_failed(error, bytes);
        self.1.decode_failed(error, bytes);
    }

    fn call_sent(&self, method: &str, body: &[u8]) {
        self.0.call_sent(method, body);
        self.1.call_sent(method, body);
    }

    fn fault(&self, code: &str, message: &str) {
        self.0.fault(code, message);
        self.1.fault(code, message);
    }
}

impl<T: Observer + ?Sized> Observer for std::sync::Arc<T> {
    fn encoded(&self, value: &Value, bytes: &[u8]) {
        (**self).encoded(value, bytes);
    }

    fn encode_failed(&self, error: &EncodeError) {
        (**self).encode_failed(error);
    }

    fn decoded(&self, value: &Value, bytes: &[u8]) {
        (**self).decoded(value, bytes);
    }

    fn decode_failed(&self, error: &DecodeError, bytes: &[u8]) {
        (**self).decode_failed(error, bytes);
    }

    fn call_sent(&self, method: &str, body: &[u8]) {
        (**self).call_sent(method, body);
    }

    fn fault(&self, code: &str, message: &str) {
        (**self).fault(code, message);
    }
}
