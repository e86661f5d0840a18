//! Betting domain values: game types, markets, wincases and odds.
//!
//! Markets and wincases travel in JSON as `[name, {params}]`. Each market
//! kind fixes its parameter shape: `{}` for yes/no markets, `{"threshold": n}`
//! for over/under lines, `{"home": h, "away": a}` for an exact score.

use crate::chain::encoder::{Encode, EncodeError, Encoder};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameType {
    Soccer = 0,
    Hockey = 1,
}

impl GameType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soccer => "soccer_game",
            Self::Hockey => "hockey_game",
        }
    }
}

impl Serialize for GameType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.as_str(), EmptyObject {}).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GameType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, _): (String, serde_json::Value) = Deserialize::deserialize(deserializer)?;
        match name.as_str() {
            "soccer_game" => Ok(Self::Soccer),
            "hockey_game" => Ok(Self::Hockey),
            other => Err(serde::de::Error::custom(format!(
                "unsupported game type '{other}'"
            ))),
        }
    }
}

impl Encode for GameType {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_u8(*self as u8);
        Ok(())
    }
}

#[derive(Serialize)]
struct EmptyObject {}

macro_rules! market_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Market kinds in wire order; the position is the binary id.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MarketKind {
            $($variant),*
        }

        impl MarketKind {
            pub const ALL: &'static [MarketKind] = &[$(MarketKind::$variant),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(MarketKind::$variant => $name),*
                }
            }
        }
    };
}

market_kinds! {
    ResultHome => "result_home",
    ResultDraw => "result_draw",
    ResultAway => "result_away",
    RoundHome => "round_home",
    Handicap => "handicap",
    CorrectScoreHome => "correct_score_home",
    CorrectScoreDraw => "correct_score_draw",
    CorrectScoreAway => "correct_score_away",
    CorrectScore => "correct_score",
    GoalHome => "goal_home",
    GoalBoth => "goal_both",
    GoalAway => "goal_away",
    Total => "total",
    TotalGoalsHome => "total_goals_home",
    TotalGoalsAway => "total_goals_away",
}

impl MarketKind {
    pub fn id(self) -> i8 {
        self as i8
    }

    pub fn params_shape(self) -> ParamsShape {
        match self {
            Self::Handicap | Self::Total | Self::TotalGoalsHome | Self::TotalGoalsAway => {
                ParamsShape::Threshold
            }
            Self::CorrectScore => ParamsShape::Score,
            _ => ParamsShape::None,
        }
    }

    /// Threshold markets are settled over/under, every other kind yes/no.
    pub fn accepts(self, side: WincaseSide) -> bool {
        let over_under = matches!(side, WincaseSide::Over | WincaseSide::Under);
        over_under == (self.params_shape() == ParamsShape::Threshold)
    }

    fn check_params(self, params: &MarketParams) -> Result<(), String> {
        if params.shape() == self.params_shape() {
            return Ok(());
        }
        Err(format!(
            "market '{}' takes {:?} params, got {:?}",
            self.as_str(),
            self.params_shape(),
            params.shape()
        ))
    }

    fn check_side(self, side: WincaseSide) -> Result<(), String> {
        if self.accepts(side) {
            return Ok(());
        }
        Err(format!(
            "market '{}' has no '{}' side",
            self.as_str(),
            side.as_str()
        ))
    }
}

/// Which parameters a market kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamsShape {
    None,
    Threshold,
    Score,
}

impl FromStr for MarketKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown market '{s}'"))
    }
}

/// Per-market parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MarketParams {
    #[default]
    None,
    Threshold(i16),
    Score { home: u16, away: u16 },
}

impl MarketParams {
    pub fn shape(&self) -> ParamsShape {
        match self {
            Self::None => ParamsShape::None,
            Self::Threshold(_) => ParamsShape::Threshold,
            Self::Score { .. } => ParamsShape::Score,
        }
    }
}

impl Serialize for MarketParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Self::None => serializer.serialize_map(Some(0))?.end(),
            Self::Threshold(threshold) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("threshold", &threshold)?;
                map.end()
            }
            Self::Score { home, away } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("home", &home)?;
                map.serialize_entry("away", &away)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for MarketParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Score { home: u16, away: u16 },
            Threshold { threshold: i16 },
            Empty {},
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Score { home, away } => Self::Score { home, away },
            Raw::Threshold { threshold } => Self::Threshold(threshold),
            Raw::Empty {} => Self::None,
        })
    }
}

impl Encode for MarketParams {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        match *self {
            Self::None => {}
            Self::Threshold(threshold) => enc.write_i16(threshold),
            Self::Score { home, away } => {
                enc.write_u16(home);
                enc.write_u16(away);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Market {
    pub kind: MarketKind,
    pub params: MarketParams,
}

impl Market {
    pub fn new(kind: MarketKind, params: MarketParams) -> Self {
        Self { kind, params }
    }
}

impl Serialize for Market {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.kind.as_str(), &self.params).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Market {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, params): (String, MarketParams) = Deserialize::deserialize(deserializer)?;
        let kind: MarketKind = name.parse().map_err(serde::de::Error::custom)?;
        kind.check_params(&params).map_err(serde::de::Error::custom)?;
        Ok(Self { kind, params })
    }
}

impl Encode for Market {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        self.kind
            .check_params(&self.params)
            .map_err(EncodeError::MarketShape)?;
        enc.write_i8(self.kind.id());
        self.params.encode(enc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WincaseSide {
    Yes,
    No,
    Over,
    Under,
}

impl WincaseSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Over => "over",
            Self::Under => "under",
        }
    }

    fn offset(self) -> i8 {
        match self {
            Self::Yes | Self::Over => 0,
            Self::No | Self::Under => 1,
        }
    }
}

impl FromStr for WincaseSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            "over" => Ok(Self::Over),
            "under" => Ok(Self::Under),
            other => Err(format!("unknown wincase side '{other}'")),
        }
    }
}

/// One outcome of a market, named `"<market>::<side>"` in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wincase {
    pub market: MarketKind,
    pub side: WincaseSide,
    pub params: MarketParams,
}

impl Wincase {
    pub fn new(market: MarketKind, side: WincaseSide, params: MarketParams) -> Self {
        Self {
            market,
            side,
            params,
        }
    }

    /// Two ids per market: the positive side first.
    pub fn id(&self) -> i8 {
        self.market.id() * 2 + self.side.offset()
    }
}

impl fmt::Display for Wincase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.market.as_str(), self.side.as_str())
    }
}

impl Serialize for Wincase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.to_string(), &self.params).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Wincase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, params): (String, MarketParams) = Deserialize::deserialize(deserializer)?;
        let (market, side) = name
            .split_once("::")
            .ok_or_else(|| serde::de::Error::custom(format!("malformed wincase '{name}'")))?;
        let market: MarketKind = market.parse().map_err(serde::de::Error::custom)?;
        let side: WincaseSide = side.parse().map_err(serde::de::Error::custom)?;
        market.check_side(side).map_err(serde::de::Error::custom)?;
        market.check_params(&params).map_err(serde::de::Error::custom)?;
        Ok(Self {
            market,
            side,
            params,
        })
    }
}

impl Encode for Wincase {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        self.market
            .check_side(self.side)
            .and_then(|()| self.market.check_params(&self.params))
            .map_err(EncodeError::MarketShape)?;
        enc.write_i8(self.id());
        self.params.encode(enc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Odds {
    pub numerator: i32,
    pub denominator: i32,
}

impl Encode for Odds {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_i32(self.numerator);
        enc.write_i32(self.denominator);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Created,
    Started,
    Finished,
    Resolved,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResolveKind {
    Win,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetCancelKind {
    Pending,
    Matched,
}
