//! Flat records to typed `EventRecord`s.

use chrono::{DateTime, Utc};

use netsoc_core::{
    ConnectionFields, DhcpFields, DnsFields, EventKind, EventPayload, EventRecord, FieldValue,
    HttpFields, SshFields,
};

use crate::flatten::FlatRecord;
use crate::timestamp::CANDIDATES;

const PATH_KEYS: &[&str] = &["_path", "path", "log_type"];
const SOURCE_KEYS: &[&str] = &["id.orig_h", "orig_h", "src_ip", "source_ip"];
const DEST_KEYS: &[&str] = &["id.resp_h", "resp_h", "dst_ip", "dest_ip"];
const PORT_KEYS: &[&str] = &["id.resp_p", "resp_p", "dst_port", "dest_port"];

pub(crate) const UNKNOWN_HOST: &str = "unknown";

/// Removes attributes as they are given a typed home; what is left over
/// becomes `EventRecord::extra`.
struct Fields(FlatRecord);

impl Fields {
    fn take(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key).filter(|v| !v.is_null())
    }

    fn take_first(&mut self, keys: &[&str]) -> Option<FieldValue> {
        let mut found = None;
        for key in keys {
            let value = self.take(key);
            if found.is_none() {
                found = value;
            }
        }
        found
    }

    fn text(&mut self, key: &str) -> Option<String> {
        self.take(key).map(|v| v.to_string()).filter(|s| !s.is_empty())
    }

    fn count(&mut self, key: &str) -> Option<u64> {
        self.take(key).and_then(|v| v.as_u64())
    }

    fn flag(&mut self, key: &str) -> Option<bool> {
        match self.take(key)? {
            FieldValue::Boolean(b) => Some(b),
            FieldValue::Text(s) => match s.as_str() {
                "T" | "true" | "True" => Some(true),
                "F" | "false" | "False" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }
}

/// Kind from the log path; records without one are classified by the
/// attributes they carry.
fn classify(fields: &mut Fields) -> (EventKind, Option<String>) {
    if let Some(path) = fields.take_first(PATH_KEYS) {
        let path = path.to_string();
        return (EventKind::from_path(&path), Some(path));
    }

    let kind = if fields.has("query") {
        EventKind::Dns
    } else if fields.has("uri") {
        EventKind::Http
    } else if fields.has("msg_types") || fields.has("msg_type") {
        EventKind::Dhcp
    } else if fields.has("auth_attempts") {
        EventKind::Ssh
    } else if fields.has("conn_state") {
        EventKind::Connection
    } else {
        EventKind::Other
    };
    (kind, None)
}

pub(crate) fn normalize(record: FlatRecord, timestamp: DateTime<Utc>) -> EventRecord {
    let mut f = Fields(record);
    for key in CANDIDATES {
        f.take(key);
    }

    let (kind, path) = classify(&mut f);
    let host = |v: Option<FieldValue>| {
        v.map(|v| v.to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_HOST.to_string())
    };
    let source_host = host(f.take_first(SOURCE_KEYS));
    let dest_host = host(f.take_first(DEST_KEYS));
    let dest_port = f
        .take_first(PORT_KEYS)
        .and_then(|v| v.as_u64())
        .and_then(|p| u16::try_from(p).ok());
    let proto = f.text("proto");

    let payload = match kind {
        EventKind::Connection => EventPayload::Connection(ConnectionFields {
            conn_state: f.text("conn_state").and_then(|s| s.parse().ok()),
            orig_bytes: f.count("orig_bytes"),
            resp_bytes: f.count("resp_bytes"),
            service: f.text("service"),
        }),
        EventKind::Ssh => EventPayload::Ssh(SshFields {
            conn_state: f.text("conn_state").and_then(|s| s.parse().ok()),
            auth_attempts: f.count("auth_attempts").and_then(|n| u32::try_from(n).ok()),
            user: f.text("user").or_else(|| f.text("username")),
            success: f.flag("auth_success"),
        }),
        EventKind::Dhcp => EventPayload::Dhcp(DhcpFields {
            msg_type: f.text("msg_types").or_else(|| f.text("msg_type")),
            assigned_addr: f.text("assigned_addr"),
            mac: f.text("mac"),
            hostname: f.text("host_name").or_else(|| f.text("hostname")),
        }),
        EventKind::Dns => EventPayload::Dns(DnsFields {
            query: f.text("query"),
            qtype_name: f.text("qtype_name"),
            rcode_name: f.text("rcode_name"),
        }),
        EventKind::Http => EventPayload::Http(HttpFields {
            method: f.text("method"),
            host: f.text("host"),
            uri: f.text("uri"),
            status_code: f.count("status_code").and_then(|c| u16::try_from(c).ok()),
            user_agent: f.text("user_agent"),
        }),
        EventKind::Other => EventPayload::Other { path },
    };

    EventRecord {
        timestamp,
        source_host,
        dest_host,
        dest_port,
        proto,
        payload,
        extra: f.0.into_iter().filter(|(_, v)| !v.is_null()).collect(),
    }
}
