use crate::chain::encoder::{Encode, EncodeError, Encoder};
use crate::chain::operations::{Operation, Operations};
use crate::chain::time::ChainTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Transaction envelope. `ref_block_num`/`ref_block_prefix` tie it to a
/// recent block; `signatures` hold hex-encoded compact signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: ChainTime,
    pub operations: Operations,
    #[serde(default)]
    pub extensions: Vec<Value>,
    #[serde(default)]
    pub signatures: Vec<String>,
}

impl Transaction {
    pub fn new(ref_block_num: u16, ref_block_prefix: u32, expiration: ChainTime) -> Self {
        Self {
            ref_block_num,
            ref_block_prefix,
            expiration,
            operations: Operations::new(),
            extensions: Vec::new(),
            signatures: Vec::new(),
        }
    }

    pub fn push_operation(&mut self, op: impl Into<Operation>) {
        self.operations.push(op);
    }

    /// Canonical bytes covered by the signatures. Signatures themselves are
    /// not part of the output.
    pub fn serialize(&self) -> Result<Vec<u8>, EncodeError> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }

    /// First 20 bytes of sha256 over the canonical bytes.
    pub fn id(&self) -> Result<[u8; 20], EncodeError> {
        let digest = Sha256::digest(self.serialize()?);
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);
        Ok(id)
    }

    pub fn id_hex(&self) -> Result<String, EncodeError> {
        self.id().map(hex::encode)
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }
}

impl Encode for Transaction {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        if self.operations.is_empty() {
            return Err(EncodeError::EmptyTransaction);
        }
        enc.write_u16(self.ref_block_num);
        enc.write_u32(self.ref_block_prefix);
        self.expiration.encode(enc)?;
        self.operations.encode(enc)?;
        // extensions are always written empty
        enc.write_uvarint(0);
        Ok(())
    }
}
