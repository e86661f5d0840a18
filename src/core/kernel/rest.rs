use crate::core::config::HttpConfig;
use crate::core::errors::ClientError;
use crate::core::traits::{Caller, NoticeCallback};
use crate::core::types::{RpcEnvelope, RpcRequest};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument, trace};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Builder for [`HttpTransport`]
pub struct HttpTransportBuilder {
    url: String,
    config: HttpConfig,
}

impl HttpTransportBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: HttpConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HttpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.config.requests_per_second = Some(requests_per_second);
        self
    }

    pub fn build(self) -> Result<HttpTransport, ClientError> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()?;

        let limiter = self
            .config
            .requests_per_second
            .map(|limit| {
                NonZeroU32::new(limit)
                    .map(|limit| RateLimiter::direct(Quota::per_second(limit)))
                    .ok_or_else(|| {
                        ClientError::Unsupported("requests_per_second must be at least 1".to_string())
                    })
            })
            .transpose()?;

        Ok(HttpTransport {
            client,
            url: self.url,
            limiter,
            next_id: AtomicU64::new(1),
        })
    }
}

/// Stateless request/response transport: one POST per call.
pub struct HttpTransport {
    client: Client,
    url: String,
    limiter: Option<DirectRateLimiter>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .field("rate_limited", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        HttpTransportBuilder::new(url).build()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl Caller for HttpTransport {
    #[instrument(skip(self, args), fields(api = %api, method = %method))]
    async fn call(&self, api: &str, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        self.wait_for_rate_limit().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, "sending request");

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&RpcRequest::call(id, api, method, &args))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await?;
        trace!(id, body = %body, "response body");

        let decoded: RpcEnvelope = serde_json::from_str(&body)?;
        Ok(decoded.into_outcome()?)
    }

    async fn set_callback(
        &self,
        api: &str,
        method: &str,
        _callback: NoticeCallback,
    ) -> Result<(), ClientError> {
        Err(ClientError::Unsupported(format!(
            "{api}.{method}: notices need a WebSocket connection"
        )))
    }

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}
