use crate::core::config::WsConfig;
use crate::core::errors::ClientError;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Lifecycle of the physical connection.
///
/// `Closing` is terminal: once the owner asks to close, nothing redials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Closing,
}

/// Receives every inbound data frame, verbatim, plus state transitions.
///
/// Called from the read loop; implementations must not block.
pub trait FrameHandler: Send + Sync + 'static {
    fn on_frame(&self, payload: &[u8]);

    fn on_state_change(&self, _state: ConnectionState) {}
}

/// Ping bookkeeping. A late pong is reported, never acted on.
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    pub unanswered_pings: i64,
    pub last_seen: Instant,
}

struct LivenessTracker {
    unanswered_pings: AtomicI64,
    last_seen: Mutex<Instant>,
}

impl LivenessTracker {
    fn new() -> Self {
        Self {
            unanswered_pings: AtomicI64::new(0),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn seen(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn pong(&self) {
        self.unanswered_pings.store(0, Ordering::Relaxed);
        self.seen();
    }

    fn ping_sent(&self) -> i64 {
        self.unanswered_pings.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn snapshot(&self) -> Liveness {
        Liveness {
            unanswered_pings: self.unanswered_pings.load(Ordering::Relaxed),
            last_seen: *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

struct Inner {
    url: String,
    config: WsConfig,
    writer: tokio::sync::Mutex<Option<WsSink>>,
    state: watch::Sender<ConnectionState>,
    liveness: LivenessTracker,
    handler: Arc<dyn FrameHandler>,
}

impl Inner {
    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Apply a transition and tell the handler. Nothing leaves `Closing`.
    fn transition(&self, next: ConnectionState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == next || *current == ConnectionState::Closing {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(url = %self.url, state = ?next, "connection state changed");
            self.handler.on_state_change(next);
        }
        changed
    }

    async fn dial(&self) -> Result<WsSource, ClientError> {
        let (stream, _) = timeout(self.config.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ClientError::NetworkError(format!("connecting to {} timed out", self.url)))?
            .map_err(|e| ClientError::NetworkError(format!("connecting to {}: {}", self.url, e)))?;

        let (sink, source) = stream.split();
        *self.writer.lock().await = Some(sink);
        self.liveness.pong();

        if !self.transition(ConnectionState::Connected) {
            // closed while dialing
            self.writer.lock().await.take();
            return Err(ClientError::Shutdown);
        }
        Ok(source)
    }

    async fn send(&self, message: Message) -> Result<(), ClientError> {
        if self.state() != ConnectionState::Connected {
            return Err(ClientError::Shutdown);
        }
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(ClientError::Shutdown)?;
        match timeout(self.config.write_timeout, sink.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ClientError::NetworkError(format!("write failed: {e}"))),
            Err(_) => Err(ClientError::NetworkError("write timed out".to_string())),
        }
    }
}

/// Owns one WebSocket connection.
///
/// Writes are serialized behind a single lock. A read loop hands data frames
/// to the [`FrameHandler`] and redials after `reconnect_delay` whenever the
/// connection drops; a ping loop tracks liveness.
pub struct WsConnector {
    inner: Arc<Inner>,
    tasks: Vec<JoinHandle<()>>,
}

impl WsConnector {
    /// Dial `url` and start the read and ping loops. The first dial must
    /// succeed; later drops are redialed in the background.
    #[instrument(skip(config, handler))]
    pub async fn connect(
        url: &str,
        config: WsConfig,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Self, ClientError> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let inner = Arc::new(Inner {
            url: url.to_string(),
            config,
            writer: tokio::sync::Mutex::new(None),
            state,
            liveness: LivenessTracker::new(),
            handler,
        });

        let source = inner.dial().await?;
        let tasks = vec![
            tokio::spawn(read_loop(Arc::clone(&inner), source)),
            tokio::spawn(ping_loop(Arc::clone(&inner))),
        ];
        Ok(Self { inner, tasks })
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn liveness(&self) -> Liveness {
        self.inner.liveness.snapshot()
    }

    /// Whether a frame or pong arrived within the ping timeout.
    pub fn is_alive(&self) -> bool {
        self.liveness().last_seen.elapsed() <= self.inner.config.ping_timeout
    }

    /// Write one frame. Fails fast unless `Connected`.
    pub async fn send(&self, message: Message) -> Result<(), ClientError> {
        self.inner.send(message).await
    }

    /// Send a close frame, close the socket and enter `Closing`.
    /// Closing twice is an error.
    pub async fn close(&self) -> Result<(), ClientError> {
        if !self.inner.transition(ConnectionState::Closing) {
            return Err(ClientError::Shutdown);
        }

        let mut writer = self.inner.writer.lock().await;
        if let Some(mut sink) = writer.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            };
            match timeout(self.inner.config.write_timeout, sink.send(Message::Close(Some(frame)))).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(url = %self.inner.url, error = %e, "write close"),
                Err(_) => warn!(url = %self.inner.url, "write close timed out"),
            }
            if let Err(e) = sink.close().await {
                debug!(url = %self.inner.url, error = %e, "socket close");
            }
        }
        Ok(())
    }
}

impl Drop for WsConnector {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for WsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnector")
            .field("url", &self.inner.url)
            .field("state", &self.inner.state())
            .finish_non_exhaustive()
    }
}

async fn read_loop(inner: Arc<Inner>, source: WsSource) {
    let mut closing = inner.state.subscribe();
    let mut reader = Some(source);

    loop {
        if reader.is_none() {
            tokio::select! {
                () = sleep(inner.config.reconnect_delay) => {}
                () = closed(&mut closing) => return,
            }
            match inner.dial().await {
                Ok(source) => {
                    debug!(url = %inner.url, "reconnected");
                    reader = Some(source);
                }
                Err(ClientError::Shutdown) => return,
                Err(e) => warn!(url = %inner.url, error = %e, "redial failed"),
            }
            continue;
        }
        let Some(source) = reader.as_mut() else {
            continue;
        };

        let next = tokio::select! {
            next = source.next() => next,
            () = closed(&mut closing) => return,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                inner.liveness.seen();
                trace!(len = text.len(), "text frame");
                inner.handler.on_frame(text.as_bytes());
            }
            Some(Ok(Message::Binary(data))) => {
                inner.liveness.seen();
                inner.handler.on_frame(&data);
            }
            Some(Ok(Message::Pong(_))) => inner.liveness.pong(),
            // pings are answered by the protocol layer on the next flush
            Some(Ok(Message::Ping(_) | Message::Frame(_))) => inner.liveness.seen(),
            Some(Ok(Message::Close(frame))) => {
                debug!(url = %inner.url, ?frame, "server sent close");
            }
            Some(Err(e)) => {
                reader = None;
                connection_lost(&inner, &e.to_string()).await;
            }
            None => {
                reader = None;
                connection_lost(&inner, "stream ended").await;
            }
        }
    }
}

async fn closed(state: &mut watch::Receiver<ConnectionState>) {
    let _ = state.wait_for(|s| *s == ConnectionState::Closing).await;
}

async fn connection_lost(inner: &Inner, reason: &str) {
    if inner.state() == ConnectionState::Closing {
        return;
    }
    warn!(url = %inner.url, reason, "connection lost");
    inner.writer.lock().await.take();
    inner.transition(ConnectionState::Disconnected);
}

async fn ping_loop(inner: Arc<Inner>) {
    let mut ticker = interval(inner.config.ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match inner.state() {
            ConnectionState::Closing => return,
            ConnectionState::Disconnected => continue,
            ConnectionState::Connected => {}
        }

        let unanswered = inner.liveness.ping_sent();
        let silent_for = inner.liveness.snapshot().last_seen.elapsed();
        if silent_for > inner.config.ping_timeout {
            warn!(
                url = %inner.url,
                unanswered,
                silent_ms = silent_for.as_millis() as u64,
                "pong overdue"
            );
        }
        if let Err(e) = inner.send(Message::Ping(Vec::new())).await {
            debug!(url = %inner.url, error = %e, "ping failed");
        }
    }
}
