use crate::chain::{ChainId, PrivateKey, Transaction, TransactionSigner};
use crate::core::errors::ClientError;
use crate::core::traits::{Caller, CallerExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Reply of `broadcast_transaction_synchronous`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub id: String,
    pub block_num: u32,
    pub trx_num: u32,
    pub expired: bool,
}

/// `network_broadcast_api`
#[derive(Clone)]
pub struct NetworkBroadcastApi {
    caller: Arc<dyn Caller>,
}

impl NetworkBroadcastApi {
    pub const API_ID: &'static str = "network_broadcast_api";

    pub fn new(caller: Arc<dyn Caller>) -> Self {
        Self { caller }
    }

    /// Hand the transaction to the node without waiting for inclusion.
    pub async fn broadcast_transaction(&self, tx: &Transaction) -> Result<(), ClientError> {
        self.caller
            .call(Self::API_ID, "broadcast_transaction", vec![serde_json::to_value(tx)?])
            .await
            .map(drop)
    }

    /// Wait until the transaction is in a block.
    pub async fn broadcast_transaction_synchronous(
        &self,
        tx: &Transaction,
    ) -> Result<BroadcastResponse, ClientError> {
        self.caller
            .call_as(
                Self::API_ID,
                "broadcast_transaction_synchronous",
                vec![serde_json::to_value(tx)?],
            )
            .await
    }
}

/// Entry point bundling a caller stack, the chain id and an optional
/// signing key.
pub struct ScorumClient {
    caller: Arc<dyn Caller>,
    signer: TransactionSigner,
    signing_key: Option<PrivateKey>,
    pub network_broadcast: NetworkBroadcastApi,
}

impl ScorumClient {
    pub fn new(caller: Arc<dyn Caller>, chain_id: ChainId) -> Self {
        Self {
            network_broadcast: NetworkBroadcastApi::new(Arc::clone(&caller)),
            caller,
            signer: TransactionSigner::new(chain_id),
            signing_key: None,
        }
    }

    pub fn with_signing_key(mut self, key: PrivateKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    pub fn caller(&self) -> &Arc<dyn Caller> {
        &self.caller
    }

    pub fn signer(&self) -> &TransactionSigner {
        &self.signer
    }

    pub fn has_signing_key(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Raw call on any api, for wrappers this crate does not ship.
    pub async fn call(&self, api: &str, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        self.caller.call(api, method, args).await
    }

    /// Sign with the configured key, replacing any existing signatures.
    pub fn sign(&self, tx: &mut Transaction) -> Result<(), ClientError> {
        let key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| ClientError::Unsupported("no signing key configured".to_string()))?;
        self.signer.sign(tx, std::slice::from_ref(key))?;
        Ok(())
    }

    /// Sign, broadcast and wait for the block.
    #[instrument(skip(self, tx), fields(operations = tx.operations.len()))]
    pub async fn sign_and_broadcast(
        &self,
        tx: &mut Transaction,
    ) -> Result<BroadcastResponse, ClientError> {
        self.sign(tx)?;
        let response = self.network_broadcast.broadcast_transaction_synchronous(tx).await?;
        info!(id = %response.id, block_num = response.block_num, "transaction included");
        Ok(response)
    }

    pub async fn close(&self) -> Result<(), ClientError> {
        self.caller.close().await
    }
}

impl std::fmt::Debug for ScorumClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorumClient")
            .field("chain_id", self.signer.chain_id())
            .field("has_signing_key", &self.has_signing_key())
            .finish_non_exhaustive()
    }
}
