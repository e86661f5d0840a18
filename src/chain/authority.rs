use crate::chain::encoder::{Encode, EncodeError, Encoder};
use crate::chain::keys::PublicKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered `key -> weight` map. Iteration and encoding follow insertion order;
/// the chain does not sort these entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedMap<K> {
    entries: Vec<(K, u16)>,
}

pub type AccountAuthorityMap = WeightedMap<String>;
pub type KeyAuthorityMap = WeightedMap<PublicKey>;

impl<K> Default for WeightedMap<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq> WeightedMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update. An existing key keeps its original position.
    pub fn insert(&mut self, key: K, weight: u16) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = weight,
            None => self.entries.push((key, weight)),
        }
    }

    pub fn get(&self, key: &K) -> Option<u16> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, weight)| *weight)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u16)> {
        self.entries.iter().map(|(k, w)| (k, *w))
    }
}

impl<K: PartialEq> FromIterator<(K, u16)> for WeightedMap<K> {
    fn from_iter<I: IntoIterator<Item = (K, u16)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, weight) in iter {
            map.insert(key, weight);
        }
        map
    }
}

impl<K: Serialize> Serialize for WeightedMap<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

impl<'de, K: DeserializeOwned + PartialEq> Deserialize<'de> for WeightedMap<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(K, u16)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl<K: Encode> Encode for WeightedMap<K> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_uvarint(self.entries.len() as u64);
        for (key, weight) in &self.entries {
            key.encode(enc)?;
            enc.write_u16(*weight);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    #[serde(default)]
    pub account_auths: AccountAuthorityMap,
    #[serde(default)]
    pub key_auths: KeyAuthorityMap,
}

impl Authority {
    /// Threshold 1 satisfied by a single key.
    pub fn from_key(key: PublicKey) -> Self {
        Self {
            weight_threshold: 1,
            account_auths: AccountAuthorityMap::new(),
            key_auths: std::iter::once((key, 1)).collect(),
        }
    }
}

impl Encode for Authority {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_u32(self.weight_threshold);
        self.account_auths.encode(enc)?;
        self.key_auths.encode(enc)
    }
}
