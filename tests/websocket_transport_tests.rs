mod common;

use common::{init_tracing, spawn_ws_node};
use scorumx::core::kernel::ConnectionState;
use scorumx::core::websocket::WsTransport;
use scorumx::{Caller, ClientError, NoticeCallback, WsConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn connect(config: WsConfig) -> WsTransport {
    init_tracing();
    let url = spawn_ws_node().await;
    WsTransport::connect(&url, config).await.unwrap()
}

#[tokio::test]
async fn test_call_round_trip() {
    let transport = connect(WsConfig::default()).await;
    assert_eq!(transport.state(), ConnectionState::Connected);

    let reply = transport
        .call("database_api", "echo", vec![json!("alice")])
        .await
        .unwrap();
    assert_eq!(reply, json!(["alice"]));
    assert_eq!(transport.pending_calls(), 0);
    assert!(transport.connector().is_alive());
    assert_eq!(transport.connector().liveness().unanswered_pings, 0);
}

#[tokio::test]
async fn test_concurrent_calls_get_their_own_replies() {
    let transport = connect(WsConfig::default()).await;

    // the first reply is delayed, so replies arrive out of order
    let (slow, fast) = tokio::join!(
        transport.call("database_api", "echo", vec![json!({"delay_ms": 150, "tag": "slow"})]),
        transport.call("database_api", "echo", vec![json!({"tag": "fast"})]),
    );

    assert_eq!(slow.unwrap()[0]["tag"], "slow");
    assert_eq!(fast.unwrap()[0]["tag"], "fast");
}

#[tokio::test]
async fn test_many_concurrent_calls() {
    let transport = Arc::new(connect(WsConfig::default()).await);

    let calls = (0..32).map(|i| {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let reply = transport
                .call("database_api", "echo", vec![json!({"delay_ms": (32 - i) * 3, "n": i})])
                .await
                .unwrap();
            assert_eq!(reply[0]["n"], i);
        })
    });
    for call in futures::future::join_all(calls).await {
        call.unwrap();
    }
    assert_eq!(transport.pending_calls(), 0);
}

#[tokio::test]
async fn test_rpc_error_keeps_exception_name() {
    let transport = connect(WsConfig::default()).await;

    let err = transport.call("database_api", "fail", vec![]).await.unwrap_err();
    assert!(err.is_rpc());
    assert_eq!(err.rpc_name(), Some("assert_exception"));
}

#[tokio::test]
async fn test_wait_timeout() {
    let transport = connect(WsConfig {
        wait_timeout: Duration::from_millis(200),
        ..WsConfig::default()
    })
    .await;

    let err = transport.call("database_api", "never", vec![]).await.unwrap_err();
    assert!(matches!(err, ClientError::WaitTimeout { .. }));
    assert!(err.is_timeout());
    assert_eq!(transport.pending_calls(), 0);

    // the connection is still usable
    let reply = transport.call("database_api", "echo", vec![json!(1)]).await.unwrap();
    assert_eq!(reply, json!([1]));
}

#[tokio::test]
async fn test_cancelled_call() {
    let transport = connect(WsConfig::default()).await;

    let err = transport
        .call_until(
            "database_api",
            "never",
            vec![],
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(transport.pending_calls(), 0);
}

#[tokio::test]
async fn test_dropped_call_leaves_no_pending_entry() {
    let transport = connect(WsConfig::default()).await;

    let outcome = timeout(
        Duration::from_millis(50),
        transport.call("database_api", "never", vec![]),
    )
    .await;
    assert!(outcome.is_err());
    assert_eq!(transport.pending_calls(), 0);
}

#[tokio::test]
async fn test_callback_receives_notices() {
    let transport = connect(WsConfig::default()).await;
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let callback: NoticeCallback = Arc::new(move |payload| {
        let _ = tx.send(payload);
    });

    transport
        .set_callback("database_api", "subscribe", callback)
        .await
        .unwrap();
    assert_eq!(transport.subscriptions(), 1);

    let first = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    let second = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, json!({"n": 1}));
    assert_eq!(second, json!({"n": 2}));
}

#[tokio::test]
async fn test_failed_subscription_is_unregistered() {
    let transport = connect(WsConfig::default()).await;
    let callback: NoticeCallback = Arc::new(|_| {});

    let err = transport
        .set_callback("database_api", "fail", callback)
        .await
        .unwrap_err();
    assert!(err.is_rpc());
    assert_eq!(transport.subscriptions(), 0);
}

#[tokio::test]
async fn test_disconnect_fails_fast() {
    let transport = connect(WsConfig {
        reconnect_delay: Duration::from_secs(30),
        ..WsConfig::default()
    })
    .await;

    // the in-flight call fails as soon as the socket goes away
    let err = transport.call("database_api", "drop", vec![]).await.unwrap_err();
    assert!(matches!(err, ClientError::Shutdown));
    assert_eq!(transport.state(), ConnectionState::Disconnected);

    let outcome = timeout(
        Duration::from_millis(500),
        transport.call("database_api", "echo", vec![]),
    )
    .await
    .expect("a call while disconnected must not wait");
    assert!(matches!(outcome, Err(ClientError::Shutdown)));
}

#[tokio::test]
async fn test_reconnects_after_drop() {
    let transport = connect(WsConfig {
        reconnect_delay: Duration::from_millis(50),
        ..WsConfig::default()
    })
    .await;
    let mut state = transport.connector().subscribe_state();

    let _ = transport.call("database_api", "drop", vec![]).await;

    timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Connected),
    )
    .await
    .unwrap()
    .unwrap();

    let reply = transport.call("database_api", "echo", vec![json!("again")]).await.unwrap();
    assert_eq!(reply, json!(["again"]));
}

#[tokio::test]
async fn test_close_twice_is_an_error() {
    let transport = connect(WsConfig::default()).await;

    transport.close().await.unwrap();
    assert_eq!(transport.state(), ConnectionState::Closing);
    assert!(matches!(transport.close().await, Err(ClientError::Shutdown)));

    let err = transport.call("database_api", "echo", vec![]).await.unwrap_err();
    assert!(matches!(err, ClientError::Shutdown));
}

#[tokio::test]
async fn test_connect_failure() {
    init_tracing();
    let config = WsConfig {
        connect_timeout: Duration::from_secs(2),
        ..WsConfig::default()
    };
    // nothing listens on the discard port
    let err = WsTransport::connect("ws://127.0.0.1:9", config).await.unwrap_err();
    assert!(matches!(err, ClientError::NetworkError(_)));
}
