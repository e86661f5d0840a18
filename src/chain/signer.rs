//! Transaction digest, signing and verification.
//!
//! Signatures are 65-byte compact recoverable ECDSA: a header byte
//! `27 + 4 + recovery_id` followed by `r || s`. Only canonical signatures are
//! produced; signing retries with fresh nonce data until one is.

use crate::chain::encoder::EncodeError;
use crate::chain::keys::{PrivateKey, PublicKey};
use crate::chain::transaction::Transaction;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, Secp256k1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Identifier of the test network.
pub const TESTNET_CHAIN_ID: &str = "d3c1f19a4947c296446583f988c43fd1a83818fabaf3454a0020198cb361ebd2";

const SIGNATURE_LEN: usize = 65;
const COMPACT_HEADER: u8 = 27 + 4;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("transaction encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("malformed signature: {0}")]
    SignatureDecode(String),

    #[error("public key recovery failed: {0}")]
    Recovery(String),

    #[error("signature by {0} matches none of the expected keys")]
    KeyMismatch(PublicKey),

    #[error("transaction carries no signatures")]
    Unsigned,

    #[error("malformed chain id: {0}")]
    InvalidChainId(String),

    #[error("malformed block id: {0}")]
    InvalidBlockId(String),
}

/// Network identifier mixed into every digest. Usually 32 bytes, but the
/// node decides; any byte string is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChainId(Vec<u8>);

impl ChainId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn testnet() -> Self {
        Self(hex::decode(TESTNET_CHAIN_ID).unwrap_or_default())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for ChainId {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s)
            .map(Self)
            .map_err(|e| SignError::InvalidChainId(format!("{s}: {e}")))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Signs and verifies transactions for one network.
pub struct TransactionSigner {
    secp: Secp256k1<All>,
    chain_id: ChainId,
}

impl TransactionSigner {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            secp: Secp256k1::new(),
            chain_id,
        }
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    /// `sha256(chain_id ++ serialize(tx))`.
    pub fn digest(&self, tx: &Transaction) -> Result<[u8; 32], SignError> {
        let mut hasher = Sha256::new();
        hasher.update(self.chain_id.as_bytes());
        hasher.update(tx.serialize()?);
        Ok(hasher.finalize().into())
    }

    /// Replace the transaction's signatures with one per key, in key order.
    pub fn sign(&self, tx: &mut Transaction, keys: &[PrivateKey]) -> Result<(), SignError> {
        let message = Message::from_digest(self.digest(tx)?);
        tx.signatures = keys
            .iter()
            .map(|key| hex::encode(self.sign_canonical(&message, key)))
            .collect();
        debug!(count = tx.signatures.len(), "signed transaction");
        Ok(())
    }

    /// Every stored signature must recover to one of `keys`.
    pub fn verify(&self, tx: &Transaction, keys: &[PublicKey]) -> Result<(), SignError> {
        if tx.signatures.is_empty() {
            return Err(SignError::Unsigned);
        }
        let message = Message::from_digest(self.digest(tx)?);
        for signature in &tx.signatures {
            let recovered = self.recover(&message, signature)?;
            if !keys.contains(&recovered) {
                return Err(SignError::KeyMismatch(recovered));
            }
        }
        Ok(())
    }

    fn sign_canonical(&self, message: &Message, key: &PrivateKey) -> [u8; SIGNATURE_LEN] {
        let mut attempt: u64 = 0;
        loop {
            let signature = if attempt == 0 {
                self.secp.sign_ecdsa_recoverable(message, key.inner())
            } else {
                let mut nonce_data = [0u8; 32];
                nonce_data[..8].copy_from_slice(&attempt.to_le_bytes());
                self.secp
                    .sign_ecdsa_recoverable_with_noncedata(message, key.inner(), &nonce_data)
            };

            let (recovery_id, compact) = signature.serialize_compact();
            if is_canonical(&compact) {
                let mut out = [0u8; SIGNATURE_LEN];
                // recovery ids are 0..=3
                out[0] = COMPACT_HEADER + recovery_id.to_i32() as u8;
                out[1..].copy_from_slice(&compact);
                return out;
            }
            attempt += 1;
        }
    }

    fn recover(&self, message: &Message, signature: &str) -> Result<PublicKey, SignError> {
        let raw = hex::decode(signature)
            .map_err(|e| SignError::SignatureDecode(format!("{signature}: {e}")))?;
        if raw.len() != SIGNATURE_LEN {
            return Err(SignError::SignatureDecode(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                raw.len()
            )));
        }
        let recovery_id = RecoveryId::from_i32(i32::from(raw[0].wrapping_sub(27) & 3))
            .map_err(|e| SignError::SignatureDecode(e.to_string()))?;
        let signature = RecoverableSignature::from_compact(&raw[1..], recovery_id)
            .map_err(|e| SignError::SignatureDecode(e.to_string()))?;
        self.secp
            .recover_ecdsa(message, &signature)
            .map(PublicKey::from)
            .map_err(|e| SignError::Recovery(e.to_string()))
    }
}

fn is_canonical(compact: &[u8; 64]) -> bool {
    compact[0] & 0x80 == 0
        && !(compact[0] == 0 && compact[1] & 0x80 == 0)
        && compact[32] & 0x80 == 0
        && !(compact[32] == 0 && compact[33] & 0x80 == 0)
}

/// Low 16 bits of a block number.
pub fn ref_block_num(block_number: u32) -> u16 {
    (block_number & 0xffff) as u16
}

/// Bytes 4..8 of a hex block id, read little-endian.
pub fn ref_block_prefix(block_id: &str) -> Result<u32, SignError> {
    let raw = hex::decode(block_id)
        .map_err(|e| SignError::InvalidBlockId(format!("{block_id}: {e}")))?;
    let prefix: [u8; 4] = raw
        .get(4..8)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| SignError::InvalidBlockId(format!("{block_id}: shorter than 8 bytes")))?;
    Ok(u32::from_le_bytes(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::operations::{TransferOperation, VoteOperation};
    use serde_json::json;

    fn vote_transaction() -> Transaction {
        let mut tx = Transaction::new(36029, 1_164_960_351, "2016-08-08T12:24:17".parse().unwrap());
        tx.push_operation(VoteOperation {
            voter: "xeroc".to_string(),
            author: "xeroc".to_string(),
            permlink: "piston".to_string(),
            weight: 10000,
        });
        tx
    }

    #[test]
    fn test_digest_with_zero_chain_id() {
        let signer = TransactionSigner::new(ChainId::new(vec![0u8; 32]));
        let digest = signer.digest(&vote_transaction()).unwrap();
        assert_eq!(
            hex::encode(digest),
            "582176b1daf89984bc8b4fdcb24ff1433d1eb114a8c4bf20fb22ad580d035889"
        );
    }

    #[test]
    fn test_digest_depends_on_chain_and_operations() {
        let tx = vote_transaction();
        let zero = TransactionSigner::new(ChainId::new(vec![0u8; 32]));
        let testnet = TransactionSigner::new(ChainId::testnet());
        assert_ne!(zero.digest(&tx).unwrap(), testnet.digest(&tx).unwrap());

        let mut changed = vote_transaction();
        changed.push_operation(TransferOperation {
            from: "xeroc".to_string(),
            to: "piston".to_string(),
            amount: "1.000000000 SCR".parse().unwrap(),
            memo: String::new(),
        });
        assert_ne!(zero.digest(&tx).unwrap(), zero.digest(&changed).unwrap());
    }

    #[test]
    fn test_verify_signature_from_the_network() {
        let raw = json!({
            "ref_block_num": 57753,
            "ref_block_prefix": 1882698764,
            "expiration": "2021-12-01T17:26:00",
            "operations": [["transfer", {
                "from": "azucena",
                "to": "leonarda",
                "amount": "0.000009000 SCR",
                "memo": "{\"bet_id\":\"8b022219-3825-413e-a6ae-1cc3154bdb7f\",\"game_id\":\"17ff54ad-8472-4e4f-9e96-2b6ccbfaef33\"}"
            }]],
            "extensions": [],
            "signatures": ["204da1d0e0c5cb39978d1ad4fe4cd4446718ad0e10a19d662ac7bc9e0bba708f2c2116279fdc512d03fe2c97cdfc00804a4b958a8078f9b3b28e4f4b22f798f032"]
        });
        let tx: Transaction = serde_json::from_value(raw).unwrap();
        let key: PublicKey = "SCR7cTf2Dx9rxffs6E2z2pdn5cLMneo3AAFSsF9g4SaVviCYdfQ63".parse().unwrap();

        let signer = TransactionSigner::new(ChainId::testnet());
        signer.verify(&tx, &[key]).unwrap();

        let other_network = TransactionSigner::new(ChainId::new(vec![0u8; 32]));
        assert!(matches!(
            other_network.verify(&tx, &[key]),
            Err(SignError::KeyMismatch(_))
        ));
    }

    #[test]
    fn test_sign_then_verify() {
        let alice = PrivateKey::generate();
        let bob = PrivateKey::generate();
        let signer = TransactionSigner::new(ChainId::testnet());

        let mut tx = vote_transaction();
        tx.signatures.push("stale".to_string());
        signer.sign(&mut tx, &[alice.clone(), bob.clone()]).unwrap();

        assert_eq!(tx.signatures.len(), 2);
        for signature in &tx.signatures {
            let raw = hex::decode(signature).unwrap();
            assert_eq!(raw.len(), SIGNATURE_LEN);
            assert!((31..=34).contains(&raw[0]));
            assert!(is_canonical(raw[1..].try_into().unwrap()));
        }

        signer
            .verify(&tx, &[bob.public_key(), alice.public_key()])
            .unwrap();
        assert!(matches!(
            signer.verify(&tx, &[alice.public_key()]),
            Err(SignError::KeyMismatch(key)) if key == bob.public_key()
        ));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = PrivateKey::generate();
        let signer = TransactionSigner::new(ChainId::testnet());
        let mut first = vote_transaction();
        let mut second = vote_transaction();
        signer.sign(&mut first, &[key.clone()]).unwrap();
        signer.sign(&mut second, &[key]).unwrap();
        assert_eq!(first.signatures, second.signatures);
    }

    #[test]
    fn test_verify_failures() {
        let signer = TransactionSigner::new(ChainId::testnet());
        let key = PrivateKey::generate().public_key();

        let tx = vote_transaction();
        assert!(matches!(signer.verify(&tx, &[key]), Err(SignError::Unsigned)));

        let mut garbled = vote_transaction();
        garbled.signatures.push("zz".to_string());
        assert!(matches!(
            signer.verify(&garbled, &[key]),
            Err(SignError::SignatureDecode(_))
        ));

        let mut short = vote_transaction();
        short.signatures.push("1f00".to_string());
        assert!(matches!(
            signer.verify(&short, &[key]),
            Err(SignError::SignatureDecode(_))
        ));
    }

    #[test]
    fn test_chain_id_parsing() {
        let chain: ChainId = TESTNET_CHAIN_ID.parse().unwrap();
        assert_eq!(chain, ChainId::testnet());
        assert_eq!(chain.to_string(), TESTNET_CHAIN_ID);
        assert!(matches!(
            "not-hex".parse::<ChainId>(),
            Err(SignError::InvalidChainId(_))
        ));
    }

    #[test]
    fn test_reference_block_helpers() {
        assert_eq!(ref_block_num(0x0001_8cbd), 0x8cbd);
        assert_eq!(
            ref_block_prefix("0001d9995fe26f450000000000000000").unwrap(),
            1_164_960_351
        );
        assert!(matches!(
            ref_block_prefix("0001d9995fe26f"),
            Err(SignError::InvalidBlockId(_))
        ));
        assert!(matches!(
            ref_block_prefix("xyz"),
            Err(SignError::InvalidBlockId(_))
        ));
    }
}
