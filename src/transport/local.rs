//! # Local Stream Transport
//!
//! Calls and replies carried over a byte stream: a Unix domain socket, or any
//! in-memory `AsyncRead + AsyncWrite` pair such as `tokio::io::duplex`.
//!
//! The serving side answers each call with [`Dispatcher::handle_call`]. A stream
//! that stops parsing gets one `ProtocolException` fault and is then closed,
//! since there is no way to find the start of the next call.

use futures::{SinkExt, StreamExt};
use std::future::Future;
#[cfg(unix)]
use std::path::Path;
use std::sync::Arc;
#[cfg(unix)]
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
#[cfg(unix)]
use tokio::sync::mpsc;
#[cfg(unix)]
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tracing::debug;
#[cfg(unix)]
use tracing::{error, info, instrument, warn};

use crate::config::CodecConfig;
use crate::core::codec::{CallCodec, ReplyCodec};
use crate::error::{HessianError, Result};
use crate::protocol::dispatcher::{fault_for, Dispatcher};
use crate::service::client::Transport;

/// Answer calls on `stream` until the peer hangs up or the stream breaks.
pub async fn serve_stream<S>(stream: S, dispatcher: Arc<Dispatcher>, codec: CodecConfig) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, CallCodec::new(codec));

    while let Some(frame) = framed.next().await {
        match frame {
            Ok(call) => {
                debug!(method = %call.method, params = call.params.len(), "Call received");
                let reply = dispatcher.handle_call(&call);
                framed.send(reply).await?;
            }
            Err(e @ HessianError::Decode(_)) => {
                debug!(error = %e, "Unparseable call, closing stream");
                framed.send(fault_for(e)).await?;
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Start a Unix domain socket server that stops on CTRL+C
#[cfg(unix)]
#[instrument(skip(path, dispatcher), fields(socket_path = %path.as_ref().display()))]
pub async fn start_server<P: AsRef<Path>>(path: P, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    start_server_with_shutdown(path, dispatcher, CodecConfig::default(), shutdown_rx).await
}

/// How long shutdown waits for open connections before aborting them.
#[cfg(unix)]
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Start a Unix domain socket server with an external shutdown channel
///
/// On shutdown the listener stops accepting. Open connections keep being served
/// until their peers hang up or [`SHUTDOWN_GRACE`] runs out, then the socket file
/// is removed.
#[cfg(unix)]
#[instrument(skip(path, dispatcher, shutdown_rx), fields(socket_path = %path.as_ref().display()))]
pub async fn start_server_with_shutdown<P: AsRef<Path>>(
    path: P,
    dispatcher: Arc<Dispatcher>,
    codec: CodecConfig,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    if path.exists() {
        tokio::fs::remove_file(&path).await.ok();
    }

    let listener = UnixListener::bind(&path)?;
    info!(path = %path.display(), "Listening on unix socket");

    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                log_connection_end(finished);
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    connections.spawn(serve_stream(stream, dispatcher.clone(), codec));
                    debug!(open = connections.len(), "Connection accepted");
                }
                Err(e) => error!(error = %e, "Error accepting connection"),
            },
        }
    }
    drop(listener);

    info!(open = connections.len(), "Shutting down, draining connections");
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while let Some(finished) = connections.join_next().await {
            log_connection_end(finished);
        }
    })
    .await;
    if drained.is_err() {
        warn!(open = connections.len(), "Shutdown grace period over, aborting connections");
        connections.shutdown().await;
    }

    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!(path = %path.display(), "Removed socket file"),
        Err(e) => error!(error = %e, path = %path.display(), "Failed to remove socket file"),
    }
    Ok(())
}

#[cfg(unix)]
fn log_connection_end(finished: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match finished {
        Ok(Ok(())) => debug!("Connection closed"),
        Ok(Err(e)) => warn!(error = %e, "Connection ended with error"),
        Err(e) => warn!(error = %e, "Connection task failed"),
    }
}

/// Client side of a stream: one call in flight at a time.
///
/// The endpoint passed to [`Transport::call`] is only logged; the stream is
/// already connected to its peer.
pub struct StreamTransport<S> {
    framed: Mutex<Framed<S, ReplyCodec>>,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, codec: CodecConfig) -> Self {
        Self {
            framed: Mutex::new(Framed::new(stream, ReplyCodec::new(codec))),
        }
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn call(&self, endpoint: &str, body: Vec<u8>) -> impl Future<Output = Result<Vec<u8>>> + Send {
        debug!(endpoint, bytes = body.len(), "Writing call to stream");
        async move {
            let mut framed = self.framed.lock().await;
            framed.send(body).await?;
            match framed.next().await {
                Some(Ok(frame)) => Ok(frame.to_vec()),
                Some(Err(e)) => Err(e),
                None => Err(HessianError::ConnectionClosed),
            }
        }
    }
}

/// Connect to a Unix domain socket server
#[cfg(unix)]
#[instrument(skip(path), fields(socket_path = %path.as_ref().display()))]
pub async fn connect<P: AsRef<Path>>(path: P, codec: CodecConfig) -> Result<StreamTransport<UnixStream>> {
    let stream = UnixStream::connect(path).await?;
    Ok(StreamTransport::new(stream, codec))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::config::ClientConfig;
    use crate::core::value::Value;
    use crate::service::client::Client;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    fn echo_dispatcher() -> Arc<Dispatcher> {
        let dispatcher = Dispatcher::new();
        dispatcher
            .register("echo", |params| Ok(Value::list(params.to_vec())))
            .unwrap();
        Arc::new(dispatcher)
    }

    #[tokio::test]
    async fn test_round_trip_over_duplex() {
        let (client_side, server_side) = duplex(4096);
        let server = tokio::spawn(serve_stream(server_side, echo_dispatcher(), CodecConfig::default()));

        let transport = StreamTransport::new(client_side, CodecConfig::default());
        let client = Client::new(ClientConfig::default(), transport);

        let first = client.invoke("echo", &[Value::Int32(1)]).await.unwrap();
        assert_eq!(first, Value::list(vec![Value::Int32(1)]));

        let second = client.invoke("missing", &[]).await;
        match second {
            Err(HessianError::Fault { code, .. }) => assert_eq!(code, "NoSuchMethodException"),
            other => panic!("Expected fault, got {other:?}"),
        }

        drop(client);
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_garbage_gets_protocol_fault_then_close() {
        let (mut client_side, server_side) = duplex(1024);
        let server = tokio::spawn(serve_stream(server_side, echo_dispatcher(), CodecConfig::default()));

        client_side.write_all(b"nonsense").await.unwrap();
        let mut response = Vec::new();
        client_side.read_to_end(&mut response).await.unwrap();

        assert!(response.starts_with(b"r\x01\x00f"));
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (client_side, server_side) = duplex(64);
        drop(server_side);
        let transport = StreamTransport::new(client_side, CodecConfig::default());
        assert!(transport.call("local", b"c\x00\x01m\x00\x00z".to_vec()).await.is_err());
    }
}
