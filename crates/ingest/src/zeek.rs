//! Zeek ASCII (TSV) log reader.
//!
//! Header directives (`#separator`, `#set_separator`, `#empty_field`,
//! `#unset_field`, `#path`, `#fields`, `#types`) configure parsing of the
//! rows that follow. A file may contain several header blocks.

use netsoc_core::FieldValue;

use crate::error::IngestError;
use crate::flatten::FlatRecord;

/// True when `text` looks like a Zeek ASCII log.
pub(crate) fn looks_like_zeek(text: &str) -> bool {
    text.lines()
        .take_while(|l| l.starts_with('#'))
        .any(|l| l.starts_with("#fields"))
}

struct Header {
    separator: String,
    set_separator: String,
    empty_field: String,
    unset_field: String,
    path: Option<String>,
    fields: Vec<String>,
    types: Vec<String>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            separator: "\t".to_string(),
            set_separator: ",".to_string(),
            empty_field: "(empty)".to_string(),
            unset_field: "-".to_string(),
            path: None,
            fields: Vec::new(),
            types: Vec::new(),
        }
    }
}

/// `\x09` style escapes used in the `#separator` directive.
fn unescape(raw: &str) -> String {
    let mut out = String::new();
    let mut rest = raw;
    while let Some(pos) = rest.find("\\x") {
        out.push_str(&rest[..pos]);
        let hex = rest.get(pos + 2..pos + 4);
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(byte) => {
                out.push(byte as char);
                rest = &rest[pos + 4..];
            }
            None => {
                out.push_str("\\x");
                rest = &rest[pos + 2..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub(crate) fn parse(text: &str) -> Result<Vec<FlatRecord>, IngestError> {
    let mut header = Header::default();
    let mut records = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.is_empty() {
            continue;
        }

        if let Some(directive) = line.strip_prefix('#') {
            apply_directive(&mut header, directive);
            continue;
        }

        if header.fields.is_empty() {
            return Err(IngestError::Zeek {
                line: line_no,
                message: "data row before #fields header".to_string(),
            });
        }

        let values: Vec<&str> = line.split(header.separator.as_str()).collect();
        if values.len() != header.fields.len() {
            return Err(IngestError::Zeek {
                line: line_no,
                message: format!(
                    "expected {} columns, found {}",
                    header.fields.len(),
                    values.len()
                ),
            });
        }

        let mut record = FlatRecord::new();
        for (i, (name, raw)) in header.fields.iter().zip(values).enumerate() {
            let ty = header.types.get(i).map(String::as_str).unwrap_or("string");
            record.insert(name.clone(), convert(&header, raw, ty));
        }
        if let Some(path) = &header.path {
            record
                .entry("_path".to_string())
                .or_insert_with(|| FieldValue::Text(path.clone()));
        }
        records.push(record);
    }

    Ok(records)
}

fn apply_directive(header: &mut Header, directive: &str) {
    let (name, rest) = match directive.split_once(|c: char| c == ' ' || c == '\t') {
        Some((name, rest)) => (name, rest),
        None => (directive, ""),
    };

    match name {
        "separator" => header.separator = unescape(rest.trim()),
        "set_separator" => header.set_separator = value_of(header, rest),
        "empty_field" => header.empty_field = value_of(header, rest),
        "unset_field" => header.unset_field = value_of(header, rest),
        "path" => header.path = Some(value_of(header, rest)),
        "fields" => header.fields = split_list(header, rest),
        "types" => header.types = split_list(header, rest),
        // #open, #close and comments
        _ => {}
    }
}

fn value_of(header: &Header, rest: &str) -> String {
    rest.trim_start_matches(header.separator.as_str()).trim().to_string()
}

fn split_list(header: &Header, rest: &str) -> Vec<String> {
    rest.trim_start_matches(header.separator.as_str())
        .split(header.separator.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn convert(header: &Header, raw: &str, ty: &str) -> FieldValue {
    if raw == header.unset_field {
        return FieldValue::Null;
    }
    if raw == header.empty_field {
        return FieldValue::Text(String::new());
    }

    match ty {
        "count" | "int" | "port" => raw
            .parse::<i64>()
            .map(FieldValue::Integer)
            .unwrap_or_else(|_| FieldValue::Text(raw.to_string())),
        "double" | "time" | "interval" => raw
            .parse::<f64>()
            .map(FieldValue::Float)
            .unwrap_or_else(|_| FieldValue::Text(raw.to_string())),
        "bool" => match raw {
            "T" => FieldValue::Boolean(true),
            "F" => FieldValue::Boolean(false),
            other => FieldValue::Text(other.to_string()),
        },
        t if t.starts_with("set[") || t.starts_with("vector[") => FieldValue::Text(
            raw.split(header.set_separator.as_str())
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => FieldValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONN_LOG: &str = "#separator \\x09
#set_separator\t,
#empty_field\t(empty)
#unset_field\t-
#path\tconn
#open\t2024-05-01-10-00-00
#fields\tts\tuid\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\tconn_state\tresp_bytes\ttunnel_parents
#types\ttime\tstring\taddr\tport\taddr\tport\tenum\tstring\tcount\tset[string]
1714557600.123456\tC1\t10.0.0.5\t51515\t10.0.0.9\t4444\ttcp\tS0\t-\t(empty)
1714557601.000000\tC2\t10.0.0.5\t51516\t10.0.0.9\t443\ttcp\tSF\t1024\ta,b
#close\t2024-05-01-11-00-00
";

    #[test]
    fn detects_zeek_header() {
        assert!(looks_like_zeek(CONN_LOG));
        assert!(!looks_like_zeek("{\"ts\": 1}"));
    }

    #[test]
    fn parses_rows_with_types_and_path() {
        let rows = parse(CONN_LOG).unwrap();
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first["_path"], FieldValue::Text("conn".into()));
        assert_eq!(first["id.resp_p"], FieldValue::Integer(4444));
        assert_eq!(first["resp_bytes"], FieldValue::Null);
        assert_eq!(first["tunnel_parents"], FieldValue::Text(String::new()));
        assert!(matches!(first["ts"], FieldValue::Float(_)));

        assert_eq!(rows[1]["resp_bytes"], FieldValue::Integer(1024));
        assert_eq!(rows[1]["tunnel_parents"], FieldValue::Text("a,b".into()));
    }

    #[test]
    fn column_count_mismatch_is_an_error() {
        let bad = "#fields\tts\tuid\n1.0\tC1\textra\n";
        let err = parse(bad).unwrap_err();
        assert!(matches!(err, IngestError::Zeek { line: 2, .. }));
    }

    #[test]
    fn unescapes_separator() {
        assert_eq!(unescape("\\x09"), "\t");
        assert_eq!(unescape("\\x2c"), ",");
        assert_eq!(unescape("\\xzz"), "\\xzz");
    }
}
