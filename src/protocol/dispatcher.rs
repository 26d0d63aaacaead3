//! Method dispatcher for the serving side of a call.
//!
//! Handlers are registered by method name and invoked with the decoded
//! parameters. [`Dispatcher::handle`] runs a whole request: parse the call
//! envelope, route it, and frame the result or a fault as the reply.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::config::CodecConfig;
use crate::core::encoder::Encoder;
use crate::core::value::Value;
use crate::error::constants::{
    ERR_DISPATCHER_READ_LOCK, ERR_DISPATCHER_WRITE_LOCK, FAULT_NO_SUCH_METHOD, FAULT_PROTOCOL,
    FAULT_SERVICE,
};
use crate::error::{HessianError, Result};
use crate::protocol::envelope::{parse_call, write_reply, Call, Reply};

type HandlerFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync + 'static;

/// Routes calls to handlers by method name.
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<String, Box<HandlerFn>>>>,
    codec: CodecConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_codec_config(CodecConfig::default())
    }

    /// Dispatcher that parses requests under the given limits.
    pub fn with_codec_config(codec: CodecConfig) -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            codec,
        }
    }

    /// Register `handler` for `method`, replacing any previous one.
    pub fn register<F>(&self, method: &str, handler: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| HessianError::Custom(ERR_DISPATCHER_WRITE_LOCK.to_string()))?;

        handlers.insert(method.to_string(), Box::new(handler));
        Ok(())
    }

    /// Invoke the handler for `call.method`.
    pub fn dispatch(&self, call: &Call) -> Result<Value> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| HessianError::Custom(ERR_DISPATCHER_READ_LOCK.to_string()))?;

        handlers
            .get(call.method.as_str())
            .ok_or_else(|| HessianError::UnknownMethod(call.method.clone()))
            .and_then(|handler| handler(&call.params))
    }

    /// Dispatch and fold any failure into a fault reply.
    pub fn handle_call(&self, call: &Call) -> Reply {
        match self.dispatch(call) {
            Ok(value) => Reply::Value(value),
            Err(e) => {
                warn!(method = %call.method, error = %e, "call failed");
                fault_for(e)
            }
        }
    }

    /// Serve one complete request body, returning the reply body.
    ///
    /// A request that cannot be parsed still gets a fault reply; only a reply
    /// that cannot be encoded is returned as an error.
    pub fn handle(&self, request: &[u8]) -> Result<Vec<u8>> {
        let reply = match parse_call(request, &self.codec) {
            Ok(call) => {
                debug!(method = %call.method, params = call.params.len(), "dispatching call");
                self.handle_call(&call)
            }
            Err(e) => {
                warn!(error = %e, len = request.len(), "rejecting malformed call");
                fault_for(e.into())
            }
        };

        let mut encoder = Encoder::new();
        write_reply(&mut encoder, &reply)?;
        Ok(encoder.into_vec())
    }

    /// Whether a handler is registered for `method`.
    pub fn contains(&self, method: &str) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(method))
            .unwrap_or(false)
    }
}

/// Fault reply carrying the code that matches `error`.
pub(crate) fn fault_for(error: HessianError) -> Reply {
    let (code, message) = match error {
        HessianError::Fault { code, message } => (code, message),
        HessianError::UnknownMethod(method) => {
            (FAULT_NO_SUCH_METHOD.to_string(), format!("no such method: {method}"))
        }
        e @ HessianError::Decode(_) => (FAULT_PROTOCOL.to_string(), e.to_string()),
        e => (FAULT_SERVICE.to_string(), e.to_string()),
    };
    Reply::Fault { code, message }
}
