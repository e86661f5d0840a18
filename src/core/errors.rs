use crate::chain::{encoder::EncodeError, keys::KeyError, signer::SignError};
use crate::core::types::RpcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("connection is shut down")]
    Shutdown,

    #[error("timed out waiting for response to request {id}")]
    WaitTimeout { id: u64 },

    #[error("call cancelled")]
    Cancelled,

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Signing error: {0}")]
    Sign(#[from] SignError),
}

impl ClientError {
    /// Whether the error came from the node rejecting the call, as opposed to
    /// the transport failing to deliver it.
    pub fn is_rpc(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    /// The node-side exception name (`data.name`), when the node sent one.
    pub fn rpc_name(&self) -> Option<&str> {
        match self {
            Self::Rpc(err) => err.name(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. })
    }
}
