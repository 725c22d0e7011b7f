//! Serde adapter for optional RFC 3339 timestamps.
//!
//! Always emits nine fractional digits so readings keep full precision on
//! the wire. Accepts any RFC 3339 offset and normalizes it to UTC.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

#[allow(clippy::ref_option)]
pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(time) => serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|time| time.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    })
    .transpose()
}
