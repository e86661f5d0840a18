use crate::chain::encoder::{Encode, EncodeError, Encoder};
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// UTC timestamp with whole-second resolution. JSON form has no zone
/// designator; binary form is u32 little-endian unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainTime(DateTime<Utc>);

impl ChainTime {
    pub fn now() -> Self {
        Utc::now().into()
    }

    pub fn from_unix(seconds: i64) -> Option<Self> {
        Utc.timestamp_opt(seconds, 0).single().map(Self)
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Shift by a signed number of seconds, saturating at the representable range.
    pub fn add_seconds(&self, seconds: i64) -> Self {
        self.0
            .checked_add_signed(chrono::Duration::seconds(seconds))
            .map_or(*self, Self)
    }
}

impl From<DateTime<Utc>> for ChainTime {
    /// Drops the sub-second part the chain cannot carry.
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.with_nanosecond(0).unwrap_or(value))
    }
}

impl FromStr for ChainTime {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let naive = NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), TIME_FORMAT)?;
        Ok(Self(Utc.from_utc_datetime(&naive)))
    }
}

impl fmt::Display for ChainTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_FORMAT))
    }
}

impl Serialize for ChainTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Encode for ChainTime {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        let seconds = u32::try_from(self.unix_seconds())
            .map_err(|_| EncodeError::TimeOutOfRange(self.to_string()))?;
        enc.write_u32(seconds);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::encoder::to_bytes;

    #[test]
    fn test_parse_and_format() {
        let time: ChainTime = "2018-08-03T10:12:43".parse().unwrap();
        assert_eq!(time.unix_seconds(), 1_533_291_163);
        assert_eq!(time.to_string(), "2018-08-03T10:12:43");

        let zoned: ChainTime = "2018-08-03T10:12:43Z".parse().unwrap();
        assert_eq!(zoned, time);
    }

    #[test]
    fn test_binary_form_is_u32_seconds() {
        let time: ChainTime = "2018-08-03T10:12:43".parse().unwrap();
        assert_eq!(hex::encode(to_bytes(&time).unwrap()), "9b2a645b");
    }

    #[test]
    fn test_pre_epoch_time_cannot_be_encoded() {
        let time = ChainTime::from_unix(-1).unwrap();
        assert!(matches!(to_bytes(&time), Err(EncodeError::TimeOutOfRange(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let time: ChainTime = serde_json::from_str("\"2016-08-08T12:24:17\"").unwrap();
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"2016-08-08T12:24:17\"");
        assert_eq!(time.add_seconds(60).to_string(), "2016-08-08T12:25:17");
    }

    #[test]
    fn test_conversion_truncates_to_seconds() {
        let precise = Utc.timestamp_opt(1_533_291_163, 987_654_321).unwrap();
        let time = ChainTime::from(precise);
        assert_eq!(time, ChainTime::from_unix(1_533_291_163).unwrap());
        assert_eq!(time.to_string().parse::<ChainTime>().unwrap(), time);

        let now = ChainTime::now();
        assert_eq!(now.datetime().nanosecond(), 0);
        assert_eq!(now.to_string().parse::<ChainTime>().unwrap(), now);
    }
}
