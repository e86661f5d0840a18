use crate::chain::keys::PrivateKey;
use crate::chain::signer::ChainId;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `http(s)://` selects the HTTP transport, `ws(s)://` the WebSocket one.
    pub node_url: String,
    pub chain_id: Option<String>,
    pub signing_key: Option<Secret<String>>,
    /// HTTP request timeout, and the WebSocket wait-timeout per call.
    pub request_timeout: Duration,
}

// Custom Serialize implementation - the signing key never leaves the process
impl Serialize for ClientConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ClientConfig", 4)?;
        state.serialize_field("node_url", &self.node_url)?;
        state.serialize_field("chain_id", &self.chain_id)?;
        state.serialize_field(
            "signing_key",
            &self.signing_key.as_ref().map(|_| "[REDACTED]"),
        )?;
        state.serialize_field("request_timeout_secs", &self.request_timeout.as_secs())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ClientConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ClientConfigHelper {
            node_url: String,
            #[serde(default)]
            chain_id: Option<String>,
            #[serde(default)]
            signing_key: Option<String>,
            #[serde(default)]
            request_timeout_secs: Option<u64>,
        }

        let helper = ClientConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            node_url: helper.node_url,
            chain_id: helper.chain_id,
            signing_key: helper.signing_key.map(Secret::new),
            request_timeout: helper
                .request_timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
        })
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(node_url: impl Into<String>) -> Self {
        Self {
            node_url: node_url.into(),
            chain_id: None,
            signing_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read configuration from environment variables
    ///
    /// - `{PREFIX}_NODE_URL` (required)
    /// - `{PREFIX}_CHAIN_ID` (optional, hex)
    /// - `{PREFIX}_WIF` (optional)
    /// - `{PREFIX}_TIMEOUT_SECS` (optional, defaults to 10)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let url_var = format!("{prefix}_NODE_URL");
        let timeout_var = format!("{prefix}_TIMEOUT_SECS");

        let node_url =
            env::var(&url_var).map_err(|_| ConfigError::MissingEnvironmentVariable(url_var))?;

        let request_timeout = match env::var(&timeout_var) {
            Ok(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                ConfigError::InvalidConfiguration(format!("{timeout_var}='{raw}': {e}"))
            })?,
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };

        let config = Self {
            node_url,
            chain_id: env::var(format!("{prefix}_CHAIN_ID")).ok(),
            signing_key: env::var(format!("{prefix}_WIF")).ok().map(Secret::new),
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a `.env` file (if present), then read the environment.
    ///
    /// **Security Warning**: never commit `.env` files holding a WIF.
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            // a missing file falls through to the process environment
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    #[must_use]
    pub fn chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    #[must_use]
    pub fn signing_key(mut self, wif: impl Into<String>) -> Self {
        self.signing_key = Some(Secret::new(wif.into()));
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn has_signing_key(&self) -> bool {
        self.signing_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().is_empty())
    }

    pub fn is_websocket(&self) -> bool {
        self.node_url.starts_with("ws://") || self.node_url.starts_with("wss://")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let known_scheme = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| self.node_url.starts_with(scheme));
        if !known_scheme {
            return Err(ConfigError::InvalidConfiguration(format!(
                "unsupported node url '{}'",
                self.node_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidConfiguration(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn parsed_chain_id(&self) -> Result<Option<ChainId>, ConfigError> {
        self.chain_id
            .as_deref()
            .map(|raw| {
                raw.parse()
                    .map_err(|e| ConfigError::InvalidConfiguration(format!("chain id: {e}")))
            })
            .transpose()
    }

    /// Decode the configured WIF (exposes the secret only for the decode).
    pub fn private_key(&self) -> Result<Option<PrivateKey>, ConfigError> {
        self.signing_key
            .as_ref()
            .map(|wif| {
                PrivateKey::from_wif(wif.expose_secret())
                    .map_err(|e| ConfigError::InvalidConfiguration(format!("signing key: {e}")))
            })
            .transpose()
    }
}

/// WebSocket connector tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsConfig {
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub reconnect_delay: Duration,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    /// How long `call()` waits for its reply.
    pub wait_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(2),
            ping_interval: Duration::from_secs(5),
            ping_timeout: Duration::from_secs(10),
            wait_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Client-side throttle; `None` sends as fast as callers ask.
    pub requests_per_second: Option<u32>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: concat!("scorumx/", env!("CARGO_PKG_VERSION")).to_string(),
            requests_per_second: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_redacts_signing_key() {
        let config = ClientConfig::new("wss://node.example/ws")
            .signing_key("5JWHY5DxTF6qN5grTtChDCYBmWHfY9zaSsw4CxEKN5eZpH9iBma");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("5JWHY5Dx"));
        assert!(config.has_signing_key());
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"node_url":"https://node.example"}"#).unwrap();
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(config.chain_id.is_none());
        assert!(!config.has_signing_key());
        assert!(!config.is_websocket());
    }

    #[test]
    fn test_validate_rejects_unknown_scheme() {
        assert!(ClientConfig::new("ftp://node").validate().is_err());
        assert!(ClientConfig::new("ws://node").validate().is_ok());
        assert!(ClientConfig::new("https://node")
            .request_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_env() {
        env::set_var("SCORUMX_CFG_TEST_NODE_URL", "ws://127.0.0.1:8090");
        env::set_var("SCORUMX_CFG_TEST_TIMEOUT_SECS", "3");
        env::set_var(
            "SCORUMX_CFG_TEST_CHAIN_ID",
            crate::chain::signer::TESTNET_CHAIN_ID,
        );

        let config = ClientConfig::from_env("scorumx_cfg_test").unwrap();
        assert!(config.is_websocket());
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.parsed_chain_id().unwrap(), Some(ChainId::testnet()));
        assert!(config.private_key().unwrap().is_none());

        assert!(matches!(
            ClientConfig::from_env("scorumx_cfg_missing"),
            Err(ConfigError::MissingEnvironmentVariable(var)) if var == "SCORUMX_CFG_MISSING_NODE_URL"
        ));
    }

    #[test]
    fn test_private_key_decoding() {
        let config = ClientConfig::new("https://node")
            .signing_key("5JWHY5DxTF6qN5grTtChDCYBmWHfY9zaSsw4CxEKN5eZpH9iBma");
        let key = config.private_key().unwrap().unwrap();
        assert_eq!(
            key.public_key().to_string(),
            "SCR7jNh5ejQoqHqWcGWFJ1v4F5CzsG3EiBuz1VooCng1cH5QpJD27"
        );

        let bad = ClientConfig::new("https://node").signing_key("nope");
        assert!(bad.private_key().is_err());
    }
}
