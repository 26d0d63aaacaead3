//! Remote method invocation over a pluggable [`Transport`].
//!
//! The client owns no connection. It frames the call, hands the bytes to the
//! transport together with the configured endpoint, and parses whatever comes
//! back. A fault reply surfaces as [`HessianError::Fault`].

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::{ClientConfig, CodecConfig};
use crate::core::observer::Observer;
use crate::core::value::Value;
use crate::error::{HessianError, Result};
use crate::protocol::envelope::{build_call_envelope, build_call_envelope_with, parse_reply, Reply};
use crate::utils::metrics::Timer;

/// Moves one request body to a service and returns the response body.
pub trait Transport: Send + Sync {
    fn call(&self, endpoint: &str, body: Vec<u8>) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn call(&self, endpoint: &str, body: Vec<u8>) -> impl Future<Output = Result<Vec<u8>>> + Send {
        (**self).call(endpoint, body)
    }
}

/// Calls methods on one service endpoint.
pub struct Client<T> {
    config: ClientConfig,
    codec: CodecConfig,
    transport: T,
    observer: Option<Arc<dyn Observer>>,
}

impl<T: Transport> Client<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            codec: CodecConfig::default(),
            transport,
            observer: None,
        }
    }

    /// Limits applied when parsing replies.
    pub fn with_codec_config(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    /// Observer told about every outgoing parameter.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Host followed by url.
    pub fn endpoint(&self) -> String {
        self.config.endpoint()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Invoke `method` with `params` and wait for its result.
    #[instrument(skip(self, params), fields(endpoint = %self.config.endpoint(), params = params.len()))]
    pub async fn invoke(&self, method: &str, params: &[Value]) -> Result<Value> {
        let _timer = Timer::start("invoke");
        let body = match &self.observer {
            Some(observer) => build_call_envelope_with(method, params, observer.as_ref())?,
            None => build_call_envelope(method, params)?,
        };
        debug!(bytes = body.len(), "sending call");
        if let Some(observer) = &self.observer {
            observer.call_sent(method, &body);
        }

        let endpoint = self.config.endpoint();
        let response = tokio::time::timeout(self.config.timeout, self.transport.call(&endpoint, body))
            .await
            .map_err(|_| HessianError::Timeout)??;

        if response.is_empty() {
            warn!("empty response");
            return Err(HessianError::EmptyResponse);
        }

        let reply = match parse_reply(&response, &self.codec) {
            Ok(reply) => reply,
            Err(e) => {
                if let Some(observer) = &self.observer {
                    observer.decode_failed(&e, &response);
                }
                return Err(e.into());
            }
        };

        match reply {
            Reply::Value(value) => {
                if let Some(observer) = &self.observer {
                    observer.decoded(&value, &response);
                }
                Ok(value)
            }
            Reply::Fault { code, message } => {
                warn!(code = %code, message = %message, "remote fault");
                if let Some(observer) = &self.observer {
                    observer.fault(&code, &message);
                }
                Err(HessianError::Fault { code, message })
            }
        }
    }
}
