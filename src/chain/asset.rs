use crate::chain::encoder::{Encode, EncodeError, Encoder};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Native token symbol.
pub const SCR: &str = "SCR";

/// Decimal places shown in the textual form.
pub const ASSET_PRECISION: usize = 9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset '{0}' has no symbol")]
    MissingSymbol(String),

    #[error("asset '{0}' has trailing data after the symbol")]
    TrailingToken(String),

    #[error("invalid asset amount '{0}': {1}")]
    InvalidAmount(String, String),

    #[error("asset amount '{0}' has more than {} decimal places", ASSET_PRECISION)]
    ExcessPrecision(String),
}

/// Fixed-point amount plus symbol, written as `"10.000000000 SCR"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    pub amount: Decimal,
    pub symbol: String,
}

impl Asset {
    pub fn new(amount: Decimal, symbol: impl Into<String>) -> Self {
        Self {
            amount,
            symbol: symbol.into(),
        }
    }

    pub fn scr(amount: Decimal) -> Self {
        Self::new(amount, SCR)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*} {}", ASSET_PRECISION, self.amount, self.symbol)
    }
}

impl FromStr for Asset {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let number = tokens.next().unwrap_or_default();
        let symbol = tokens
            .next()
            .ok_or_else(|| AssetError::MissingSymbol(s.to_string()))?;
        if tokens.next().is_some() {
            return Err(AssetError::TrailingToken(s.to_string()));
        }
        let amount = Decimal::from_str(number)
            .map_err(|e| AssetError::InvalidAmount(number.to_string(), e.to_string()))?;
        if amount.scale() as usize > ASSET_PRECISION {
            return Err(AssetError::ExcessPrecision(number.to_string()));
        }
        Ok(Self::new(amount, symbol))
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Encode for Asset {
    // The raw decimal keeps every digit so excess precision is rejected
    // rather than rounded away.
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_money(&format!("{} {}", self.amount, self.symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::encoder::to_bytes;

    #[test]
    fn test_display_pads_to_nine_places() {
        let asset: Asset = "1.3003 SCR".parse().unwrap();
        assert_eq!(asset.to_string(), "1.300300000 SCR");

        let asset = Asset::scr(Decimal::from_str("123.56").unwrap());
        assert_eq!(asset.to_string(), "123.560000000 SCR");
    }

    #[test]
    fn test_parse_requires_exactly_one_symbol() {
        assert!(matches!(
            "10.000000000".parse::<Asset>(),
            Err(AssetError::MissingSymbol(_))
        ));
        assert!(matches!(
            "10.000000000 SCR SP".parse::<Asset>(),
            Err(AssetError::TrailingToken(_))
        ));
        assert!(matches!(
            "ten SCR".parse::<Asset>(),
            Err(AssetError::InvalidAmount(..))
        ));
    }

    #[test]
    fn test_json_is_a_string() {
        let asset: Asset = serde_json::from_str("\"5.000000000 SCR\"").unwrap();
        assert_eq!(asset, Asset::scr(Decimal::from(5)));
        assert_eq!(serde_json::to_string(&asset).unwrap(), "\"5.000000000 SCR\"");
    }

    #[test]
    fn test_binary_form() {
        let asset: Asset = "10.000000000 SCR".parse().unwrap();
        assert_eq!(
            hex::encode(to_bytes(&asset).unwrap()),
            "00e40b54020000000953435200000000"
        );
    }

    #[test]
    fn test_excess_precision_is_rejected() {
        assert!(matches!(
            "0.0000000001 SCR".parse::<Asset>(),
            Err(AssetError::ExcessPrecision(_))
        ));
        assert!(serde_json::from_str::<Asset>("\"1.0000000005 SCR\"").is_err());

        // values built in code still cannot reach the wire
        let asset = Asset::scr(Decimal::new(1, 10));
        assert!(matches!(
            to_bytes(&asset),
            Err(EncodeError::MoneyPrecision { .. })
        ));
    }
}
