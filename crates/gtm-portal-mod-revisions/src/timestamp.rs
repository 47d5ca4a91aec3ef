/// ISO-8601 timestamps at millisecond precision.
///
/// Revisions are stamped and serialized at millisecond precision so that a
/// value written to storage or an export document reads back identical.
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Current UTC time truncated to whole milliseconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn to_iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde `serialize_with` for ISO-8601 strings.
pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_iso(ts))
}

/// Serde `deserialize_with` accepting any RFC 3339 offset.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_to_iso_uses_millis_and_z() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(to_iso(&ts), "2025-03-04T05:06:07.000Z");
    }

    #[test]
    fn test_now_has_no_sub_millisecond_part() {
        let ts = now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_deserialize_accepts_offsets() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "crate::timestamp")]
            at: DateTime<Utc>,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"at": "2025-03-04T07:06:07.250+02:00"}"#)
            .expect("parse");
        assert_eq!(to_iso(&parsed.at), "2025-03-04T05:06:07.250Z");
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        #[derive(Debug, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "crate::timestamp")]
            #[allow(dead_code)]
            at: DateTime<Utc>,
        }
        assert!(serde_json::from_str::<Wrapper>(r#"{"at": "yesterday"}"#).is_err());
    }
}
