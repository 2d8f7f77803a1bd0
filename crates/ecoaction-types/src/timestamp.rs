//! Backend timestamps. Records serialized through the ORM use
//! `YYYY-MM-DD HH:MM:SS`, hand-built payloads use ISO 8601 with a `T`;
//! both may carry fractional seconds. Use with `#[serde(with = "timestamp")]`
//! or, for nullable columns, `#[serde(with = "timestamp::option")]`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serializer, de};

const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const READ_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse either separator, with or without fractional seconds.
pub fn parse(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    READ_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&value.format(WRITE_FORMAT))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {:?}", raw)))
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => super::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// `null`, a missing field and an empty string all read as `None`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {:?}", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn both_separators_parse() {
        let spaced = parse("2025-10-18 09:00:00").unwrap();
        let iso = parse("2025-10-18T09:00:00").unwrap();
        assert_eq!(spaced, iso);
        assert_eq!(spaced.day(), 18);
        assert_eq!(spaced.hour(), 9);
    }

    #[test]
    fn fractional_seconds_are_optional() {
        let micro = parse("2025-10-01T08:30:12.123456").unwrap();
        assert_eq!(micro.nanosecond(), 123_456_000);
        assert!(parse("2025-10-01 08:30:12.5").is_some());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse("18/10/2025").is_none());
        assert!(parse("").is_none());
    }
}
