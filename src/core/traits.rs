use crate::core::errors::ClientError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Handler invoked with each payload the node pushes for a subscription.
pub type NoticeCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// The boundary every API wrapper talks to: one JSON-RPC call in, one JSON
/// result out. Transports and decorators all implement it.
#[async_trait]
pub trait Caller: Send + Sync {
    /// Invoke `method` on `api` with positional `args`.
    async fn call(&self, api: &str, method: &str, args: Vec<Value>) -> Result<Value, ClientError>;

    /// Subscribe `callback` to notices the node sends after `api.method`
    /// registers a callback id.
    async fn set_callback(
        &self,
        api: &str,
        method: &str,
        callback: NoticeCallback,
    ) -> Result<(), ClientError>;

    async fn close(&self) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: Caller + ?Sized> Caller for Arc<T> {
    async fn call(&self, api: &str, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        (**self).call(api, method, args).await
    }

    async fn set_callback(
        &self,
        api: &str,
        method: &str,
        callback: NoticeCallback,
    ) -> Result<(), ClientError> {
        (**self).set_callback(api, method, callback).await
    }

    async fn close(&self) -> Result<(), ClientError> {
        (**self).close().await
    }
}

/// Typed helpers on top of [`Caller`].
#[async_trait]
pub trait CallerExt: Caller {
    /// Call and deserialize the result into `T`.
    async fn call_as<T: DeserializeOwned + Send>(
        &self,
        api: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<T, ClientError> {
        let value = self.call(api, method, args).await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl<C: Caller + ?Sized> CallerExt for C {}
