#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Client and dispatcher talking over real streams
//! In-memory duplex pipes everywhere, plus a Unix domain socket on unix

use hessian_codec::config::{ClientConfig, CodecConfig};
use hessian_codec::protocol::mapper::{from_value, to_value, Accessor, Field, Mapped};
use hessian_codec::transport::local::{serve_stream, StreamTransport};
use hessian_codec::{Client, Dispatcher, HessianError, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::duplex;

#[derive(Debug, Default, Clone, PartialEq)]
struct Order {
    kind: String,
    id: i32,
    name: String,
    total: f64,
}

impl Mapped for Order {
    const FIELDS: &'static [Field<Self>] = &[
        Field::new("Type", Accessor::Str(|o| &o.kind, |o, v| o.kind = v)),
        Field::new("ID", Accessor::Int32(|o| o.id, |o, v| o.id = v)),
        Field::new("Name", Accessor::Str(|o| &o.name, |o, v| o.name = v)),
        Field::new("Total", Accessor::Float64(|o| o.total, |o, v| o.total = v)),
    ];
}

fn order_service() -> Arc<Dispatcher> {
    let dispatcher = Dispatcher::new();

    dispatcher
        .register("getOrder", |params| {
            let id = params
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| HessianError::Custom("id required".into()))?;
            let order = Order {
                kind: "Order".into(),
                id: id as i32,
                name: format!("order-{id}"),
                total: id as f64 * 1.5,
            };
            Ok(to_value(&order)?)
        })
        .unwrap();

    dispatcher
        .register("repriced", |params| {
            let mut order: Order = from_value(params.first().unwrap_or(&Value::Null))?;
            order.total *= 2.0;
            Ok(to_value(&order)?)
        })
        .unwrap();

    Arc::new(dispatcher)
}

fn client_over_duplex() -> (
    Client<StreamTransport<tokio::io::DuplexStream>>,
    tokio::task::JoinHandle<hessian_codec::Result<()>>,
) {
    let (client_side, server_side) = duplex(64 * 1024);
    let server = tokio::spawn(serve_stream(server_side, order_service(), CodecConfig::default()));
    let client = Client::new(
        ClientConfig::new("local://orders", "/"),
        StreamTransport::new(client_side, CodecConfig::default()),
    );
    (client, server)
}

#[tokio::test]
async fn test_typed_record_over_the_wire() {
    let (client, server) = client_over_duplex();

    let value = client.invoke("getOrder", &[Value::Int32(7)]).await.unwrap();
    let order: Order = from_value(&value).unwrap();
    assert_eq!(order.name, "order-7");
    assert_eq!(order.total, 10.5);

    let repriced = client.invoke("repriced", &[to_value(&order).unwrap()]).await.unwrap();
    let repriced: Order = from_value(&repriced).unwrap();
    assert_eq!(repriced.total, 21.0);
    assert_eq!(repriced.id, 7);

    drop(client);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_faults_do_not_break_the_connection() {
    let (client, server) = client_over_duplex();

    match client.invoke("deleteOrder", &[]).await {
        Err(HessianError::Fault { code, .. }) => assert_eq!(code, "NoSuchMethodException"),
        other => panic!("Expected fault, got {other:?}"),
    }
    match client.invoke("getOrder", &[]).await {
        Err(HessianError::Fault { code, message }) => {
            assert_eq!(code, "ServiceException");
            assert!(message.contains("id required"));
        }
        other => panic!("Expected fault, got {other:?}"),
    }
    match client.invoke("repriced", &[Value::from("not an order")]).await {
        Err(HessianError::Fault { code, .. }) => assert_eq!(code, "ProtocolException"),
        other => panic!("Expected fault, got {other:?}"),
    }

    assert!(client.invoke("getOrder", &[Value::Int32(1)]).await.is_ok());

    drop(client);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_large_string_parameter() {
    let (client, server) = client_over_duplex();

    // Over two string chunks, written through a 64 KiB pipe.
    let big = "é".repeat(70_000);
    match client.invoke("getOrder", &[Value::from(big.as_str())]).await {
        Err(HessianError::Fault { code, .. }) => assert_eq!(code, "ServiceException"),
        other => panic!("Expected fault, got {other:?}"),
    }

    drop(client);
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_server_gone() {
    let (client_side, server_side) = duplex(1024);
    drop(server_side);
    let mut config = ClientConfig::default();
    config.timeout = Duration::from_secs(2);
    let client = Client::new(config, StreamTransport::new(client_side, CodecConfig::default()));

    assert!(client.invoke("getOrder", &[Value::Int32(1)]).await.is_err());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unix_socket_round_trip() {
    use hessian_codec::transport::local::{connect, start_server_with_shutdown};
    use tokio::sync::mpsc;

    let path = std::env::temp_dir().join(format!("hessian-e2e-{}.sock", std::process::id()));
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    let server_path = path.clone();
    let server = tokio::spawn(async move {
        start_server_with_shutdown(server_path, order_service(), CodecConfig::default(), shutdown_rx)
            .await
    });

    // Wait for the socket to appear.
    for _ in 0..50 {
        if path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    {
        let transport = connect(&path, CodecConfig::default()).await.unwrap();
        let client = Client::new(ClientConfig::default(), transport);
        let value = client.invoke("getOrder", &[Value::Int32(3)]).await.unwrap();
        assert_eq!(from_value::<Order>(&value).unwrap().id, 3);
    }

    shutdown_tx.send(()).await.unwrap();
    server.await.unwrap().unwrap();
    assert!(!path.exists());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unix_shutdown_drains_open_connections() {
    use hessian_codec::transport::local::{connect, start_server_with_shutdown};
    use tokio::sync::mpsc;

    let path = std::env::temp_dir().join(format!("hessian-drain-{}.sock", std::process::id()));
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    let server_path = path.clone();
    let server = tokio::spawn(async move {
        start_server_with_shutdown(server_path, order_service(), CodecConfig::default(), shutdown_rx)
            .await
    });

    for _ in 0..50 {
        if path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let transport = connect(&path, CodecConfig::default()).await.unwrap();
    let client = Client::new(ClientConfig::default(), transport);
    assert!(client.invoke("getOrder", &[Value::Int32(1)]).await.is_ok());

    shutdown_tx.send(()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The listener is gone but the open connection is still served.
    let value = client.invoke("getOrder", &[Value::Int32(2)]).await.unwrap();
    assert_eq!(from_value::<Order>(&value).unwrap().id, 2);
    assert!(!server.is_finished());

    drop(client);
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop once the last connection closes")
        .unwrap()
        .unwrap();
    assert!(!path.exists());
}
