use std::collections::BTreeMap;

use serde_json::{Map, Value};

use netsoc_core::FieldValue;

/// One input record with nested objects flattened to dotted keys.
pub(crate) type FlatRecord = BTreeMap<String, FieldValue>;

const RAW_KEYS: &[&str] = &["_raw", "result._raw"];

/// Keys under which API exports usually put their record list.
const CONTAINER_KEYS: &[&str] = &[
    "records", "data", "results", "items", "events", "rows", "log", "entries",
];

/// Find the record list inside a parsed JSON document.
///
/// Preferred container keys first, then any other nested list depth-first,
/// else the object itself is the single record.
pub(crate) fn extract_records(container: Value) -> Vec<Value> {
    match container {
        Value::Array(items) => items,
        Value::Object(map) => match records_in_object(&map) {
            Some(found) => found,
            None => vec![Value::Object(map)],
        },
        _ => Vec::new(),
    }
}

fn records_in_object(map: &Map<String, Value>) -> Option<Vec<Value>> {
    let preferred = CONTAINER_KEYS.iter().filter_map(|k| map.get(*k));
    for value in preferred.chain(map.values()) {
        match value {
            Value::Array(items) => return Some(items.clone()),
            Value::Object(inner) => {
                if let Some(found) = records_in_object(inner).filter(|v| !v.is_empty()) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

/// Flatten one JSON record, merging embedded `_raw` JSON strings over it.
/// Non-object records produce None.
pub(crate) fn flatten_record(value: Value) -> Option<FlatRecord> {
    if !value.is_object() {
        return None;
    }

    let mut out = FlatRecord::new();
    flatten_into("", &value, &mut out);

    for key in RAW_KEYS {
        let Some(FieldValue::Text(raw)) = out.get(*key).cloned() else {
            continue;
        };
        if let Ok(inner @ Value::Object(_)) = serde_json::from_str::<Value>(&raw) {
            flatten_into("", &inner, &mut out);
        }
    }
    Some(out)
}

fn flatten_into(prefix: &str, value: &Value, out: &mut FlatRecord) {
    let key = |k: &str| {
        if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{prefix}.{k}")
        }
    };

    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(&key(k), v, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), scalar(other));
        }
    }
}

/// Scalars map directly; arrays become a comma-joined text value.
fn scalar(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => n.as_f64().map_or(FieldValue::Null, FieldValue::Float),
        },
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Array(items) => FieldValue::Text(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => FieldValue::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_known_container_keys() {
        let doc = json!({ "meta": [1], "results": [{ "a": 1 }, { "a": 2 }] });
        assert_eq!(extract_records(doc).len(), 2);
    }

    #[test]
    fn falls_back_to_nested_lists_then_the_object() {
        let nested = json!({ "outer": { "inner": [{ "a": 1 }] } });
        assert_eq!(extract_records(nested).len(), 1);

        let single = json!({ "ts": 1.0, "_path": "conn" });
        let records = extract_records(single.clone());
        assert_eq!(records, vec![single]);
    }

    #[test]
    fn flattens_nested_objects_to_dotted_keys() {
        let rec = flatten_record(json!({
            "id": { "orig_h": "10.0.0.1", "resp_p": 443 },
            "msg_types": ["DISCOVER", "OFFER"],
        }))
        .unwrap();
        assert_eq!(rec["id.orig_h"], FieldValue::Text("10.0.0.1".into()));
        assert_eq!(rec["id.resp_p"], FieldValue::Integer(443));
        assert_eq!(rec["msg_types"], FieldValue::Text("DISCOVER,OFFER".into()));
    }

    #[test]
    fn merges_embedded_raw_json() {
        let rec = flatten_record(json!({
            "_time": "2024-05-01T10:00:00Z",
            "_raw": "{\"_path\":\"dns\",\"query\":\"x.onion\",\"id\":{\"orig_h\":\"10.1.1.1\"}}",
        }))
        .unwrap();
        assert_eq!(rec["_path"], FieldValue::Text("dns".into()));
        assert_eq!(rec["id.orig_h"], FieldValue::Text("10.1.1.1".into()));
    }

    #[test]
    fn non_objects_are_skipped() {
        assert!(flatten_record(json!(42)).is_none());
    }
}
