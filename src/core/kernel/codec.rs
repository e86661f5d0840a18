use crate::core::errors::ClientError;
use crate::core::types::{RpcEnvelope, RpcRequest};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Encode a `call` request as a text frame.
pub fn encode_call(id: u64, api: &str, method: &str, args: &[Value]) -> Result<Message, ClientError> {
    let body = serde_json::to_string(&RpcRequest::call(id, api, method, args))?;
    Ok(Message::Text(body))
}

/// Decode one inbound frame payload.
///
/// Only data frames reach this point; ping, pong and close are handled by the
/// connector.
pub fn decode_frame(payload: &[u8]) -> Result<RpcEnvelope, ClientError> {
    serde_json::from_slice(payload)
        .map_err(|e| ClientError::Protocol(format!("undecodable frame: {e}")))
}
