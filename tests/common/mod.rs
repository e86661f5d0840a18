//! In-process stand-ins for a Scorum node, one per transport.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// A JSON-RPC request as the node sees it.
#[derive(Debug, Clone)]
pub struct NodeRequest {
    pub id: Value,
    pub api: String,
    pub method: String,
    pub args: Value,
}

impl NodeRequest {
    fn parse(raw: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(raw).ok()?;
        Some(Self {
            id: value["id"].clone(),
            api: value["params"][0].as_str()?.to_string(),
            method: value["params"][1].as_str()?.to_string(),
            args: value["params"][2].clone(),
        })
    }

    pub fn result(&self, result: Value) -> Value {
        json!({"id": self.id, "result": result})
    }

    pub fn error(&self, name: &str, message: &str) -> Value {
        json!({
            "id": self.id,
            "error": {
                "code": -32000,
                "message": message,
                "data": {"code": 10, "name": name, "message": message, "stack": []}
            }
        })
    }
}

/// Start an HTTP node. `handler` maps each request to a status and a body.
pub async fn spawn_http_node<F>(handler: F) -> String
where
    F: Fn(NodeRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let _ = serve_http(stream, handler.as_ref()).await;
            });
        }
    });

    format!("http://{addr}")
}

async fn serve_http<F>(mut stream: TcpStream, handler: &F) -> std::io::Result<()>
where
    F: Fn(NodeRequest) -> (u16, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let (status, body) = match NodeRequest::parse(&buf[header_end..]) {
        Some(request) => handler(request),
        None => (400, "bad request".to_string()),
    };
    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        if status == 200 { "OK" } else { "Error" },
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Start a WebSocket node that understands a handful of test methods:
///
/// - `echo`: replies with the args, after `args[0].delay_ms` if present
/// - `fail`: replies with an `assert_exception`
/// - `never`: never replies
/// - `drop`: closes the socket without a close frame
/// - `subscribe`: replies, then pushes two notices to callback `args[0]`
pub async fn spawn_ws_node() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_ws(stream));
        }
    });

    format!("ws://{addr}")
}

async fn serve_ws(stream: TcpStream) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (sink, mut source) = ws.split();
    let sink = Arc::new(Mutex::new(sink));

    while let Some(Ok(message)) = source.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Some(request) = NodeRequest::parse(text.as_bytes()) else {
            continue;
        };

        let frames = match request.method.as_str() {
            "drop" => return,
            "never" => continue,
            "fail" => vec![request.error("assert_exception", "Assert Exception")],
            "subscribe" => {
                let callback_id = request.args[0].clone();
                vec![
                    request.result(Value::Null),
                    json!({
                        "method": "notice",
                        "params": [callback_id, {"n": 1}, callback_id, {"n": 2}]
                    }),
                ]
            }
            _ => vec![request.result(request.args.clone())],
        };

        let delay = request.args[0]["delay_ms"].as_u64().unwrap_or(0);
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let mut sink = sink.lock().await;
            for frame in frames {
                if sink.send(Message::Text(frame.to_string())).await.is_err() {
                    return;
                }
            }
        });
    }
}
