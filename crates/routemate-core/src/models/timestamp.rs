//! Serde helpers for server timestamps.
//!
//! The server may emit either epoch milliseconds or an ISO-8601 string
//! depending on its Jackson settings, so both are accepted. Timestamps are
//! always written back as epoch milliseconds.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offset-less forms are taken as UTC
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn serialize<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(dt) => serializer.serialize_i64(dt.timestamp_millis()),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawTimestamp::Millis(ms)) => DateTime::from_timestamp_millis(ms)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
        Some(RawTimestamp::Text(text)) => parse_text(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {}", text))),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamped {
        #[serde(default, with = "super")]
        at: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[test]
    fn test_accepts_millis_and_iso_strings() {
        let millis: Stamped = serde_json::from_str(r#"{"at": 1714557600000}"#).unwrap();
        let iso: Stamped = serde_json::from_str(r#"{"at": "2024-05-01T10:00:00.000+00:00"}"#).unwrap();
        let naive: Stamped = serde_json::from_str(r#"{"at": "2024-05-01T10:00:00"}"#).unwrap();

        assert_eq!(millis.at, iso.at);
        assert_eq!(iso.at, naive.at);
        assert_eq!(millis.at.unwrap().timestamp(), 1_714_557_600);
    }

    #[test]
    fn test_null_and_missing_are_none() {
        let null: Stamped = serde_json::from_str(r#"{"at": null}"#).unwrap();
        let missing: Stamped = serde_json::from_str("{}").unwrap();
        assert!(null.at.is_none());
        assert!(missing.at.is_none());
    }

    #[test]
    fn test_rejects_garbage_and_writes_millis() {
        assert!(serde_json::from_str::<Stamped>(r#"{"at": "yesterday"}"#).is_err());

        let stamped: Stamped = serde_json::from_str(r#"{"at": 1714557600000}"#).unwrap();
        assert_eq!(serde_json::to_string(&stamped).unwrap(), r#"{"at":1714557600000}"#);
    }
}
