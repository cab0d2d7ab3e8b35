use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use netsoc_core::FieldValue;

use crate::flatten::FlatRecord;

/// Timestamp fields, in lookup order.
pub(crate) const CANDIDATES: &[&str] = &[
    "ts",
    "_time",
    "timestamp",
    "_write_ts",
    "start_time",
    "end_time",
    "time",
    "datetime",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Resolution {
    Resolved(DateTime<Utc>),
    /// The record carries no candidate field at all.
    Missing,
    /// A candidate field is present but none parses.
    Invalid,
}

pub(crate) fn resolve(record: &FlatRecord) -> Resolution {
    let mut present = false;
    for key in CANDIDATES {
        let Some(value) = record.get(*key).filter(|v| !v.is_null()) else {
            continue;
        };
        present = true;
        if let Some(ts) = parse(value) {
            return Resolution::Resolved(ts);
        }
    }
    if present {
        Resolution::Invalid
    } else {
        Resolution::Missing
    }
}

/// Epoch seconds (number or numeric text), RFC 3339, or a naive UTC
/// date-time.
pub(crate) fn parse(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Integer(secs) => Utc.timestamp_opt(*secs, 0).single(),
        FieldValue::Float(secs) => from_epoch(*secs),
        FieldValue::Text(text) => parse_text(text.trim()),
        FieldValue::Boolean(_) | FieldValue::Null => None,
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(secs) = text.parse::<f64>() {
        return from_epoch(secs);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn from_epoch(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos).single()
}

/// `1970-01-01T00:00:00Z + index` seconds, for datasets without any time field.
pub(crate) fn synthetic(index: usize) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(index as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, FieldValue)]) -> FlatRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn parses_epoch_and_text_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(parse(&FieldValue::Integer(1_714_557_600)), Some(expected));
        assert_eq!(parse(&FieldValue::Float(1_714_557_600.0)), Some(expected));
        assert_eq!(parse(&FieldValue::Text("1714557600.000".into())), Some(expected));
        assert_eq!(parse(&FieldValue::Text("2024-05-01T10:00:00Z".into())), Some(expected));
        assert_eq!(parse(&FieldValue::Text("2024-05-01T12:00:00+02:00".into())), Some(expected));
        assert_eq!(parse(&FieldValue::Text("2024-05-01 10:00:00".into())), Some(expected));
        assert_eq!(parse(&FieldValue::Text("2024-05-01T10:00:00.000".into())), Some(expected));
        assert_eq!(parse(&FieldValue::Text("yesterday".into())), None);
    }

    #[test]
    fn keeps_fractional_seconds() {
        let ts = parse(&FieldValue::Float(10.25)).unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn later_candidates_are_fallbacks() {
        let r = rec(&[
            ("ts", FieldValue::Null),
            ("_write_ts", FieldValue::Text("2024-05-01T10:00:00Z".into())),
        ]);
        assert!(matches!(resolve(&r), Resolution::Resolved(_)));
    }

    #[test]
    fn missing_and_invalid_are_distinct() {
        assert_eq!(resolve(&rec(&[("uid", FieldValue::Text("C1".into()))])), Resolution::Missing);
        assert_eq!(resolve(&rec(&[("ts", FieldValue::Text("garbage".into()))])), Resolution::Invalid);
    }

    #[test]
    fn synthetic_sequence_starts_at_epoch() {
        assert_eq!(synthetic(0), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(synthetic(3).timestamp(), 3);
    }
}
