use crate::core::errors::ClientError;
use crate::core::traits::{Caller, NoticeCallback};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// How a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Ok,
    Error,
    Timeout,
}

impl CallStatus {
    fn of(result: &Result<Value, ClientError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) if e.is_timeout() => Self::Timeout,
            Err(_) => Self::Error,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

/// Counters for one `api.method`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    pub pending: i64,
    pub ok: u64,
    pub error: u64,
    pub timeout: u64,
    pub total_latency: Duration,
    pub max_latency: Duration,
}

impl RouteStats {
    pub const fn completed(&self) -> u64 {
        self.ok + self.error + self.timeout
    }

    pub fn mean_latency(&self) -> Duration {
        match u32::try_from(self.completed()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_latency / n,
        }
    }
}

/// In-process call statistics, shared by every [`MetricsCaller`] that is
/// handed the same instance.
#[derive(Debug, Default)]
pub struct CallMetrics {
    routes: Mutex<HashMap<String, RouteStats>>,
}

impl CallMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RouteStats>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn started(&self, route: &str) {
        self.lock().entry(route.to_string()).or_default().pending += 1;
    }

    fn finished(&self, route: &str, status: Option<CallStatus>, elapsed: Duration) {
        let mut routes = self.lock();
        let stats = routes.entry(route.to_string()).or_default();
        stats.pending -= 1;
        // a dropped call only leaves the pending gauge
        let Some(status) = status else {
            return;
        };
        match status {
            CallStatus::Ok => stats.ok += 1,
            CallStatus::Error => stats.error += 1,
            CallStatus::Timeout => stats.timeout += 1,
        }
        stats.total_latency += elapsed;
        stats.max_latency = stats.max_latency.max(elapsed);
    }

    pub fn route(&self, api: &str, method: &str) -> Option<RouteStats> {
        self.lock().get(&format!("{api}.{method}")).copied()
    }

    /// Every route seen so far, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, RouteStats)> {
        let mut all: Vec<_> = self.lock().iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

/// Balances the pending gauge even when the call future is dropped.
struct InFlight<'a> {
    metrics: &'a CallMetrics,
    route: &'a str,
    started: Instant,
    status: Option<CallStatus>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.metrics
            .finished(self.route, self.status, self.started.elapsed());
    }
}

/// Records pending, outcome and latency of every call on the wrapped
/// [`Caller`].
#[derive(Debug)]
pub struct MetricsCaller<C> {
    inner: C,
    metrics: Arc<CallMetrics>,
}

impl<C: Caller> MetricsCaller<C> {
    pub fn new(inner: C, metrics: Arc<CallMetrics>) -> Self {
        Self { inner, metrics }
    }

    pub fn metrics(&self) -> &Arc<CallMetrics> {
        &self.metrics
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Caller> Caller for MetricsCaller<C> {
    async fn call(&self, api: &str, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        let route = format!("{api}.{method}");
        self.metrics.started(&route);
        let mut in_flight = InFlight {
            metrics: &self.metrics,
            route: &route,
            started: Instant::now(),
            status: None,
        };

        let result = self.inner.call(api, method, args).await;

        let status = CallStatus::of(&result);
        debug!(
            api,
            method,
            status = status.as_str(),
            elapsed_ms = in_flight.started.elapsed().as_secs_f64() * 1000.0,
            "call finished"
        );
        in_flight.status = Some(status);
        result
    }

    async fn set_callback(
        &self,
        api: &str,
        method: &str,
        callback: NoticeCallback,
    ) -> Result<(), ClientError> {
        self.inner.set_callback(api, method, callback).await
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Scripted;

    #[async_trait]
    impl Caller for Scripted {
        async fn call(&self, _api: &str, method: &str, _args: Vec<Value>) -> Result<Value, ClientError> {
            match method {
                "ok" => Ok(json!(true)),
                "slow" => Err(ClientError::WaitTimeout { id: 1 }),
                "hang" => std::future::pending().await,
                _ => Err(ClientError::Shutdown),
            }
        }

        async fn set_callback(&self, _: &str, _: &str, _: NoticeCallback) -> Result<(), ClientError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_counts_by_outcome() {
        let metrics = CallMetrics::new();
        let caller = MetricsCaller::new(Scripted, Arc::clone(&metrics));

        caller.call("test_api", "ok", vec![]).await.unwrap();
        caller.call("test_api", "ok", vec![]).await.unwrap();
        caller.call("test_api", "slow", vec![]).await.unwrap_err();
        caller.call("test_api", "broken", vec![]).await.unwrap_err();

        let ok = metrics.route("test_api", "ok").unwrap();
        assert_eq!((ok.ok, ok.error, ok.timeout, ok.pending), (2, 0, 0, 0));
        assert_eq!(metrics.route("test_api", "slow").unwrap().timeout, 1);
        assert_eq!(metrics.route("test_api", "broken").unwrap().error, 1);
        assert_eq!(metrics.snapshot().len(), 3);
        assert!(metrics.route("test_api", "missing").is_none());
    }

    #[tokio::test]
    async fn test_dropped_call_clears_pending() {
        let metrics = CallMetrics::new();
        let caller = MetricsCaller::new(Scripted, Arc::clone(&metrics));

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            caller.call("test_api", "hang", vec![]),
        )
        .await;
        assert!(outcome.is_err());

        let stats = metrics.route("test_api", "hang").unwrap();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.completed(), 0);
        assert_eq!(stats.mean_latency(), Duration::ZERO);
    }
}
