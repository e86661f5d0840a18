use crate::chain::encoder::{Encode, EncodeError, Encoder};
use ripemd::Ripemd160;
use secp256k1::{Secp256k1, SecretKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

/// Prefix of the textual public key form.
pub const KEY_PREFIX: &str = "SCR";

const PUBLIC_KEY_TEXT_LEN: usize = 53;
const CHECKSUM_LEN: usize = 4;
const WIF_VERSION: u8 = 0x80;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("public key must be {expected} characters, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("public key must start with 'SCR'")]
    WrongPrefix,

    #[error("public key checksum mismatch")]
    WrongChecksum,

    #[error("invalid base58: {0}")]
    Base58(String),

    #[error("invalid secp256k1 key: {0}")]
    InvalidKey(String),

    #[error("WIF payload has {0} bytes")]
    WifLength(usize),

    #[error("unexpected WIF version byte {0:#04x}")]
    WifVersion(u8),

    #[error("WIF checksum mismatch")]
    WifChecksum,
}

fn ripemd_checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = Ripemd160::digest(data);
    let mut out = [0_u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[..CHECKSUM_LEN]);
    out
}

fn double_sha_checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = Sha256::digest(Sha256::digest(data));
    let mut out = [0_u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[..CHECKSUM_LEN]);
    out
}

/// Compressed secp256k1 public key. Text form is
/// `"SCR" + base58(point ++ ripemd160(point)[..4])`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(secp256k1::PublicKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        secp256k1::PublicKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))
    }

    /// 33-byte compressed point.
    pub fn to_bytes(&self) -> [u8; 33] {
        self.0.serialize()
    }

    pub fn inner(&self) -> &secp256k1::PublicKey {
        &self.0
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(key: secp256k1::PublicKey) -> Self {
        Self(key)
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != PUBLIC_KEY_TEXT_LEN {
            return Err(KeyError::WrongLength {
                expected: PUBLIC_KEY_TEXT_LEN,
                actual: s.len(),
            });
        }
        let encoded = s.strip_prefix(KEY_PREFIX).ok_or(KeyError::WrongPrefix)?;
        let decoded = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| KeyError::Base58(e.to_string()))?;
        if decoded.len() <= CHECKSUM_LEN {
            return Err(KeyError::WrongLength {
                expected: PUBLIC_KEY_TEXT_LEN,
                actual: s.len(),
            });
        }
        let (point, checksum) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
        if ripemd_checksum(point) != checksum {
            return Err(KeyError::WrongChecksum);
        }
        Self::from_bytes(point)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let point = self.to_bytes();
        let mut payload = Vec::with_capacity(point.len() + CHECKSUM_LEN);
        payload.extend_from_slice(&point);
        payload.extend_from_slice(&ripemd_checksum(&point));
        write!(f, "{}{}", KEY_PREFIX, bs58::encode(payload).into_string())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_string()).finish()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Encode for PublicKey {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_raw(&self.to_bytes());
        Ok(())
    }
}

/// secp256k1 secret key, exchanged in uncompressed WIF form.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(SecretKey);

impl PrivateKey {
    pub fn generate() -> Self {
        Self(SecretKey::new(&mut rand::thread_rng()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))
    }

    /// Derive a key from a brain key phrase: `sha256(phrase)`.
    pub fn from_brain_key(phrase: &str) -> Result<Self, KeyError> {
        let digest: Zeroizing<[u8; 32]> = Zeroizing::new(Sha256::digest(phrase.as_bytes()).into());
        Self::from_bytes(digest.as_slice())
    }

    pub fn from_wif(wif: &str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(
            bs58::decode(wif)
                .into_vec()
                .map_err(|e| KeyError::Base58(e.to_string()))?,
        );
        // 1 version byte, 32 key bytes, optional compression flag, 4 checksum bytes.
        if decoded.len() != 37 && decoded.len() != 38 {
            return Err(KeyError::WifLength(decoded.len()));
        }
        let (payload, checksum) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
        if double_sha_checksum(payload) != checksum {
            return Err(KeyError::WifChecksum);
        }
        if payload[0] != WIF_VERSION {
            return Err(KeyError::WifVersion(payload[0]));
        }
        Self::from_bytes(&payload[1..33])
    }

    pub fn to_wif(&self) -> String {
        let mut payload = Zeroizing::new(Vec::with_capacity(1 + 32 + CHECKSUM_LEN));
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.0.secret_bytes());
        let checksum = double_sha_checksum(&payload);
        payload.extend_from_slice(&checksum);
        bs58::encode(payload.as_slice()).into_string()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.public_key(&Secp256k1::signing_only()))
    }

    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.secret_bytes())
    }

    pub(crate) fn inner(&self) -> &SecretKey {
        &self.0
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wif(s)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}
