use crate::client::ScorumClient;
use crate::core::config::{ClientConfig, ConfigError, HttpConfig, WsConfig};
use crate::core::errors::ClientError;
use crate::core::kernel::HttpTransportBuilder;
use crate::core::metrics::{CallMetrics, MetricsCaller};
use crate::core::retry::{RetryCaller, RetryOptions};
use crate::core::traits::Caller;
use crate::core::websocket::WsTransport;
use std::sync::Arc;
use tracing::info;

/// Assembles a caller stack from a [`ClientConfig`]: the transport picked by
/// the url scheme, then optional retry and metrics layers.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
    ws: WsConfig,
    http: HttpConfig,
    retry: Option<RetryOptions>,
    retry_overrides: Vec<(String, String, RetryOptions)>,
    metrics: Option<Arc<CallMetrics>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            ws: WsConfig::default(),
            http: HttpConfig::default(),
            retry: None,
            retry_overrides: Vec::new(),
            metrics: None,
        }
    }

    pub fn with_ws_config(mut self, ws: WsConfig) -> Self {
        self.ws = ws;
        self
    }

    pub fn with_http_config(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    pub fn with_retry(mut self, options: RetryOptions) -> Self {
        self.retry = Some(options);
        self
    }

    /// Per-method policy; enables the retry layer on its own.
    pub fn with_method_retry(mut self, api: &str, method: &str, options: RetryOptions) -> Self {
        self.retry_overrides
            .push((api.to_string(), method.to_string(), options));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<CallMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Connect and return the bare caller stack.
    pub async fn build_caller(&self) -> Result<Arc<dyn Caller>, ClientError> {
        self.config.validate()?;

        let transport: Arc<dyn Caller> = if self.config.is_websocket() {
            let ws = WsConfig {
                wait_timeout: self.config.request_timeout,
                ..self.ws
            };
            Arc::new(WsTransport::connect(&self.config.node_url, ws).await?)
        } else {
            let http = HttpConfig {
                timeout: self.config.request_timeout,
                ..self.http.clone()
            };
            Arc::new(
                HttpTransportBuilder::new(self.config.node_url.clone())
                    .with_config(http)
                    .build()?,
            )
        };
        info!(url = %self.config.node_url, websocket = self.config.is_websocket(), "transport ready");

        let with_retry: Arc<dyn Caller> = if self.retry.is_some() || !self.retry_overrides.is_empty() {
            let mut retrying = RetryCaller::new(transport).with_default_retry(self.retry.unwrap_or_default());
            for (api, method, options) in &self.retry_overrides {
                retrying = retrying.with_retry(api, method, *options);
            }
            Arc::new(retrying)
        } else {
            transport
        };

        Ok(match &self.metrics {
            Some(metrics) => Arc::new(MetricsCaller::new(with_retry, Arc::clone(metrics))),
            None => with_retry,
        })
    }

    /// Connect and wrap the stack in a [`ScorumClient`]. Needs a chain id;
    /// a configured WIF becomes the client's signing key.
    pub async fn build(self) -> Result<ScorumClient, ClientError> {
        let chain_id = self.config.parsed_chain_id()?.ok_or_else(|| {
            ConfigError::InvalidConfiguration("chain id is required to sign".to_string())
        })?;
        let signing_key = self.config.private_key()?;

        let caller = self.build_caller().await?;
        let client = ScorumClient::new(caller, chain_id);
        Ok(match signing_key {
            Some(key) => client.with_signing_key(key),
            None => client,
        })
    }
}
