use crate::core::config::WsConfig;
use crate::core::errors::ClientError;
use crate::core::kernel::codec::{decode_frame, encode_call};
use crate::core::kernel::ws::{ConnectionState, FrameHandler, WsConnector};
use crate::core::traits::{Caller, NoticeCallback};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

type Reply = oneshot::Sender<Result<Value, ClientError>>;
type ReplyReceiver = oneshot::Receiver<Result<Value, ClientError>>;

#[derive(Default)]
struct PendingTable {
    last_id: u64,
    calls: HashMap<u64, Reply>,
}

/// Requests waiting for their reply, keyed by request id.
///
/// An entry leaves the table exactly once: completed by the read loop,
/// failed when the connection goes away, or removed by the waiting caller.
#[derive(Default)]
struct PendingCalls {
    table: Mutex<PendingTable>,
}

impl PendingCalls {
    fn lock(&self) -> MutexGuard<'_, PendingTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an id that is neither 0 nor still pending.
    fn register(&self) -> (u64, ReplyReceiver) {
        let (tx, rx) = oneshot::channel();
        let mut table = self.lock();
        let mut id = table.last_id;
        loop {
            id = id.wrapping_add(1);
            if id != 0 && !table.calls.contains_key(&id) {
                break;
            }
        }
        table.last_id = id;
        table.calls.insert(id, tx);
        (id, rx)
    }

    fn take(&self, id: u64) -> Option<Reply> {
        self.lock().calls.remove(&id)
    }

    fn fail_all(&self) -> usize {
        let drained: Vec<Reply> = self.lock().calls.drain().map(|(_, reply)| reply).collect();
        let failed = drained.len();
        for reply in drained {
            // the caller may already have given up
            let _ = reply.send(Err(ClientError::Shutdown));
        }
        failed
    }

    fn len(&self) -> usize {
        self.lock().calls.len()
    }
}

/// Removes its pending entry when the waiting future finishes or is dropped.
struct PendingGuard<'a> {
    pending: &'a PendingCalls,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.take(self.id);
    }
}

#[derive(Default)]
struct Subscriptions {
    last_id: u64,
    callbacks: HashMap<u64, NoticeCallback>,
}

/// Callback ids handed to the node, and the handler each one routes to.
#[derive(Default)]
struct SubscriptionRegistry {
    inner: Mutex<Subscriptions>,
}

impl SubscriptionRegistry {
    fn lock(&self) -> MutexGuard<'_, Subscriptions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, callback: NoticeCallback) -> u64 {
        let mut subs = self.lock();
        let mut id = subs.last_id;
        loop {
            id = id.wrapping_add(1);
            if id != 0 && !subs.callbacks.contains_key(&id) {
                break;
            }
        }
        subs.last_id = id;
        subs.callbacks.insert(id, callback);
        id
    }

    fn unregister(&self, id: u64) -> bool {
        self.lock().callbacks.remove(&id).is_some()
    }

    fn get(&self, id: u64) -> Option<NoticeCallback> {
        self.lock().callbacks.get(&id).cloned()
    }

    fn len(&self) -> usize {
        self.lock().callbacks.len()
    }
}

/// Routes inbound frames: replies to their pending call, notices to their
/// subscription.
#[derive(Default)]
struct Dispatcher {
    pending: PendingCalls,
    subscriptions: SubscriptionRegistry,
}

impl Dispatcher {
    fn dispatch_notice(&self, params: &[Value]) {
        if params.len() % 2 != 0 {
            error!(len = params.len(), "notice with odd parameter count dropped");
            return;
        }

        for pair in params.chunks_exact(2) {
            let Some(callback_id) = pair[0].as_u64() else {
                error!(callback_id = %pair[0], "notice callback id is not an integer");
                return;
            };
            let Some(callback) = self.subscriptions.get(callback_id) else {
                error!(callback_id, "notice for unregistered callback");
                return;
            };
            callback(pair[1].clone());
        }
    }
}

impl FrameHandler for Dispatcher {
    fn on_frame(&self, payload: &[u8]) {
        let envelope = match decode_frame(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, "dropping frame");
                return;
            }
        };

        if let Some(id) = envelope.id {
            if let Some(reply) = self.pending.take(id) {
                let _ = reply.send(envelope.into_outcome().map_err(ClientError::from));
                return;
            }
        }

        if envelope.is_notice() {
            self.dispatch_notice(envelope.params.as_deref().unwrap_or_default());
            return;
        }

        match envelope.id {
            Some(id) => warn!(id, "response for a call nobody is waiting on"),
            None => error!(method = ?envelope.method, "frame is neither a response nor a notice"),
        }
    }

    // Only leaving a live connection strands calls; a call registered right
    // after a redial belongs to the new socket.
    fn on_state_change(&self, state: ConnectionState) {
        if state == ConnectionState::Connected {
            return;
        }
        let failed = self.pending.fail_all();
        if failed > 0 {
            debug!(?state, failed, "failed pending calls");
        }
    }
}

/// JSON-RPC over one WebSocket connection.
///
/// Any number of tasks may call concurrently; replies are matched by id and
/// may arrive in any order. Calls in flight when the connection drops fail
/// with [`ClientError::Shutdown`] and are never replayed.
pub struct WsTransport {
    connector: WsConnector,
    dispatcher: Arc<Dispatcher>,
    wait_timeout: Duration,
}

impl WsTransport {
    #[instrument(skip(config))]
    pub async fn connect(url: &str, config: WsConfig) -> Result<Self, ClientError> {
        let dispatcher = Arc::new(Dispatcher::default());
        let handler: Arc<dyn FrameHandler> = Arc::clone(&dispatcher) as Arc<dyn FrameHandler>;
        let connector = WsConnector::connect(url, config, handler).await?;
        Ok(Self {
            connector,
            dispatcher,
            wait_timeout: config.wait_timeout,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.connector.state()
    }

    pub fn connector(&self) -> &WsConnector {
        &self.connector
    }

    /// Number of calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.dispatcher.pending.len()
    }

    pub fn subscriptions(&self) -> usize {
        self.dispatcher.subscriptions.len()
    }

    /// Like [`Caller::call`], but gives up with [`ClientError::Cancelled`] as
    /// soon as `cancel` completes. The request stays on the wire; a late
    /// reply is discarded.
    #[instrument(skip(self, args, cancel), fields(api = %api, method = %method))]
    pub async fn call_until<F>(
        &self,
        api: &str,
        method: &str,
        args: Vec<Value>,
        cancel: F,
    ) -> Result<Value, ClientError>
    where
        F: Future<Output = ()> + Send,
    {
        if self.connector.state() != ConnectionState::Connected {
            return Err(ClientError::Shutdown);
        }

        let (id, reply) = self.dispatcher.pending.register();
        let _guard = PendingGuard {
            pending: &self.dispatcher.pending,
            id,
        };

        let frame = encode_call(id, api, method, &args)?;
        debug!(id, "sending request");
        self.connector.send(frame).await?;

        tokio::select! {
            biased;
            outcome = reply => outcome.unwrap_or(Err(ClientError::Shutdown)),
            () = sleep(self.wait_timeout) => Err(ClientError::WaitTimeout { id }),
            () = cancel => Err(ClientError::Cancelled),
        }
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("connector", &self.connector)
            .field("pending_calls", &self.pending_calls())
            .field("wait_timeout", &self.wait_timeout)
            .finish()
    }
}

#[async_trait]
impl Caller for WsTransport {
    async fn call(&self, api: &str, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        self.call_until(api, method, args, std::future::pending()).await
    }

    async fn set_callback(
        &self,
        api: &str,
        method: &str,
        callback: NoticeCallback,
    ) -> Result<(), ClientError> {
        let id = self.dispatcher.subscriptions.register(callback);
        match self.call(api, method, vec![json!(id)]).await {
            Ok(_) => {
                debug!(api, method, callback_id = id, "callback registered");
                Ok(())
            }
            Err(e) => {
                self.dispatcher.subscriptions.unregister(id);
                Err(e)
            }
        }
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.connector.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recorder() -> (NoticeCallback, Arc<StdMutex<Vec<Value>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: NoticeCallback = Arc::new(move |payload| sink.lock().unwrap().push(payload));
        (callback, seen)
    }

    #[test]
    fn test_reply_completes_matching_call() {
        let dispatcher = Dispatcher::default();
        let (first, mut first_rx) = dispatcher.pending.register();
        let (second, mut second_rx) = dispatcher.pending.register();
        assert_ne!(first, second);

        dispatcher.on_frame(format!(r#"{{"id":{second},"result":"two"}}"#).as_bytes());
        dispatcher.on_frame(format!(r#"{{"id":{first},"result":"one"}}"#).as_bytes());

        assert_eq!(first_rx.try_recv().unwrap().unwrap(), json!("one"));
        assert_eq!(second_rx.try_recv().unwrap().unwrap(), json!("two"));
        assert_eq!(dispatcher.pending.len(), 0);
    }

    #[test]
    fn test_rpc_error_reaches_caller() {
        let dispatcher = Dispatcher::default();
        let (id, mut rx) = dispatcher.pending.register();
        let frame = format!(
            r#"{{"id":{id},"error":{{"code":-32000,"message":"Assert Exception","data":{{"code":10,"name":"assert_exception","message":"","stack":[]}}}}}}"#
        );
        dispatcher.on_frame(frame.as_bytes());

        let err = rx.try_recv().unwrap().unwrap_err();
        assert!(err.is_rpc());
        assert_eq!(err.rpc_name(), Some("assert_exception"));
    }

    #[test]
    fn test_late_reply_is_discarded() {
        let dispatcher = Dispatcher::default();
        let (id, _rx) = dispatcher.pending.register();
        {
            let _guard = PendingGuard {
                pending: &dispatcher.pending,
                id,
            };
        }
        assert_eq!(dispatcher.pending.len(), 0);
        // second removal is a no-op
        assert!(dispatcher.pending.take(id).is_none());
        dispatcher.on_frame(format!(r#"{{"id":{id},"result":1}}"#).as_bytes());
    }

    #[test]
    fn test_ids_skip_zero_and_pending() {
        let pending = PendingCalls::default();
        let (first, _a) = pending.register();
        assert_eq!(first, 1);

        pending.lock().last_id = u64::MAX;
        let (wrapped, _b) = pending.register();
        assert_eq!(wrapped, 2);
    }

    #[test]
    fn test_notice_dispatches_each_pair() {
        let dispatcher = Dispatcher::default();
        let (first_cb, first_seen) = recorder();
        let (second_cb, second_seen) = recorder();
        let first = dispatcher.subscriptions.register(first_cb);
        let second = dispatcher.subscriptions.register(second_cb);
        assert_eq!((first, second), (1, 2));

        let frame = format!(
            r#"{{"method":"notice","params":[{second},{{"block":7}},{first},[1,2],{second},null]}}"#
        );
        dispatcher.on_frame(frame.as_bytes());

        assert_eq!(*first_seen.lock().unwrap(), vec![json!([1, 2])]);
        assert_eq!(
            *second_seen.lock().unwrap(),
            vec![json!({"block": 7}), Value::Null]
        );
    }

    #[test]
    fn test_malformed_notices_are_dropped() {
        let dispatcher = Dispatcher::default();
        let (callback, seen) = recorder();
        let id = dispatcher.subscriptions.register(callback);

        // odd parameter count drops everything
        dispatcher.on_frame(format!(r#"{{"method":"notice","params":[{id},1,{id}]}}"#).as_bytes());
        assert!(seen.lock().unwrap().is_empty());

        // an unregistered id drops the rest of the notice
        dispatcher.on_frame(
            format!(r#"{{"method":"notice","params":[{id},"a",99,"b",{id},"c"]}}"#).as_bytes(),
        );
        assert_eq!(*seen.lock().unwrap(), vec![json!("a")]);

        // garbage frames do not disturb later ones
        dispatcher.on_frame(b"{not json");
        dispatcher.on_frame(format!(r#"{{"method":"notice","params":[{id},"d"]}}"#).as_bytes());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_state_change_fails_pending_calls() {
        let dispatcher = Dispatcher::default();
        let (_, mut first) = dispatcher.pending.register();
        let (_, mut second) = dispatcher.pending.register();

        dispatcher.on_state_change(ConnectionState::Disconnected);

        assert!(matches!(first.try_recv().unwrap(), Err(ClientError::Shutdown)));
        assert!(matches!(second.try_recv().unwrap(), Err(ClientError::Shutdown)));
        assert_eq!(dispatcher.pending.len(), 0);
    }

    #[test]
    fn test_call_registered_during_redial_survives() {
        let dispatcher = Dispatcher::default();
        let (id, mut reply) = dispatcher.pending.register();

        dispatcher.on_state_change(ConnectionState::Connected);
        assert!(reply.try_recv().is_err());
        assert_eq!(dispatcher.pending.len(), 1);

        dispatcher.on_frame(json!({"id": id, "result": "fresh"}).to_string().as_bytes());
        assert_eq!(reply.try_recv().unwrap().unwrap(), json!("fresh"));

        let (_, mut stranded) = dispatcher.pending.register();
        dispatcher.on_state_change(ConnectionState::Closing);
        assert!(matches!(stranded.try_recv().unwrap(), Err(ClientError::Shutdown)));
    }

    #[test]
    fn test_unregister_subscription() {
        let registry = SubscriptionRegistry::default();
        let (callback, _) = recorder();
        let id = registry.register(callback);
        assert!(registry.get(id).is_some());
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert_eq!(registry.len(), 0);
    }
}
