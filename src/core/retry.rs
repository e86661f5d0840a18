use crate::core::errors::ClientError;
use crate::core::traits::{Caller, NoticeCallback};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::{instrument, warn};

/// Fixed-delay retry policy. `retry_limit` counts retries, so a call is
/// attempted at most `retry_limit + 1` times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOptions {
    pub delay: Duration,
    pub retry_limit: usize,
}

impl RetryOptions {
    pub const fn new(delay: Duration, retry_limit: usize) -> Self {
        Self { delay, retry_limit }
    }
}

/// Retries every failed call of the wrapped [`Caller`], whatever the error.
///
/// Callbacks are registered once, without retry.
#[derive(Debug)]
pub struct RetryCaller<C> {
    inner: C,
    default_options: RetryOptions,
    overrides: HashMap<String, RetryOptions>,
}

impl<C: Caller> RetryCaller<C> {
    /// Wrap `inner` with no retries until a policy is set.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            default_options: RetryOptions::default(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_default_retry(mut self, options: RetryOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Use `options` for `api.method` instead of the default.
    pub fn with_retry(mut self, api: &str, method: &str, options: RetryOptions) -> Self {
        self.overrides.insert(route_key(api, method), options);
        self
    }

    pub fn options_for(&self, api: &str, method: &str) -> RetryOptions {
        self.overrides
            .get(&route_key(api, method))
            .copied()
            .unwrap_or(self.default_options)
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

fn route_key(api: &str, method: &str) -> String {
    format!("{api}.{method}")
}

#[async_trait]
impl<C: Caller> Caller for RetryCaller<C> {
    #[instrument(skip(self, args), fields(api = %api, method = %method))]
    async fn call(&self, api: &str, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        let options = self.options_for(api, method);
        let strategy = FixedInterval::new(options.delay).take(options.retry_limit);
        let inner = &self.inner;

        let mut attempt = 0_usize;
        let action = move || {
            attempt += 1;
            let args = args.clone();
            async move {
                let result = inner.call(api, method, args).await;
                if let Err(e) = &result {
                    warn!(attempt, limit = options.retry_limit, error = %e, "call failed");
                }
                result
            }
        };

        Retry::spawn(strategy, action).await
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
