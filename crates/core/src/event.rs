use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed field values: source logs arrive as loosely typed JSON or TSV
/// but we keep the numeric/boolean distinction once it is known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl FieldValue {
    /// Extract as string, returning None for non-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view. Text is parsed so `"1024"` from a TSV log still counts.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) if f.is_finite() => Some(*f),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Integer(i) if *i >= 0 => Some(*i as u64),
            FieldValue::Float(f) if f.is_finite() && *f >= 0.0 => Some(*f as u64),
            FieldValue::Text(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "-"),
        }
    }
}

/// Protocol/log family of an event (Zeek `_path`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Connection,
    Ssh,
    Dhcp,
    Dns,
    Http,
    Other,
}

impl EventKind {
    /// Map a Zeek log path (`conn`, `ssh`, ...) to a kind.
    pub fn from_path(path: &str) -> Self {
        match path.trim().to_ascii_lowercase().as_str() {
            "conn" | "connection" => EventKind::Connection,
            "ssh" => EventKind::Ssh,
            "dhcp" => EventKind::Dhcp,
            "dns" => EventKind::Dns,
            "http" => EventKind::Http,
            _ => EventKind::Other,
        }
    }

    /// Zeek names of the typed attributes a record of this kind can carry,
    /// in log column order.
    pub fn typed_fields(&self) -> &'static [&'static str] {
        match self {
            EventKind::Connection => &[
                "id.orig_h", "id.resp_h", "id.resp_p", "proto", "service", "conn_state",
                "orig_bytes", "resp_bytes",
            ],
            EventKind::Ssh => &[
                "id.orig_h", "id.resp_h", "id.resp_p", "proto", "user", "auth_attempts",
                "success", "conn_state",
            ],
            EventKind::Dhcp => &[
                "id.orig_h", "id.resp_h", "id.resp_p", "proto", "mac", "assigned_addr",
                "msg_type", "hostname",
            ],
            EventKind::Dns => &[
                "id.orig_h", "id.resp_h", "id.resp_p", "proto", "query", "qtype_name",
                "rcode_name",
            ],
            EventKind::Http => &[
                "id.orig_h", "id.resp_h", "id.resp_p", "proto", "method", "host", "uri",
                "status_code", "user_agent",
            ],
            EventKind::Other => &["id.orig_h", "id.resp_h", "id.resp_p", "proto"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connection => "conn",
            EventKind::Ssh => "ssh",
            EventKind::Dhcp => "dhcp",
            EventKind::Dns => "dns",
            EventKind::Http => "http",
            EventKind::Other => "other",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zeek connection state codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnState {
    S0,
    S1,
    SF,
    REJ,
    S2,
    S3,
    RSTO,
    RSTR,
    RSTOS0,
    RSTRH,
    SH,
    SHR,
    OTH,
    Unknown(String),
}

impl ConnState {
    pub fn code(&self) -> &str {
        match self {
            ConnState::S0 => "S0",
            ConnState::S1 => "S1",
            ConnState::SF => "SF",
            ConnState::REJ => "REJ",
            ConnState::S2 => "S2",
            ConnState::S3 => "S3",
            ConnState::RSTO => "RSTO",
            ConnState::RSTR => "RSTR",
            ConnState::RSTOS0 => "RSTOS0",
            ConnState::RSTRH => "RSTRH",
            ConnState::SH => "SH",
            ConnState::SHR => "SHR",
            ConnState::OTH => "OTH",
            ConnState::Unknown(s) => s.as_str(),
        }
    }
}

impl FromStr for ConnState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.to_ascii_uppercase().as_str() {
            "S0" => ConnState::S0,
            "S1" => ConnState::S1,
            "SF" => ConnState::SF,
            "REJ" => ConnState::REJ,
            "S2" => ConnState::S2,
            "S3" => ConnState::S3,
            "RSTO" => ConnState::RSTO,
            "RSTR" => ConnState::RSTR,
            "RSTOS0" => ConnState::RSTOS0,
            "RSTRH" => ConnState::RSTRH,
            "SH" => ConnState::SH,
            "SHR" => ConnState::SHR,
            "OTH" => ConnState::OTH,
            _ => ConnState::Unknown(s.to_string()),
        })
    }
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionFields {
    pub conn_state: Option<ConnState>,
    pub orig_bytes: Option<u64>,
    pub resp_bytes: Option<u64>,
    pub service: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SshFields {
    pub conn_state: Option<ConnState>,
    pub auth_attempts: Option<u32>,
    pub user: Option<String>,
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DhcpFields {
    pub msg_type: Option<String>,
    pub assigned_addr: Option<String>,
    pub mac: Option<String>,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsFields {
    pub query: Option<String>,
    pub qtype_name: Option<String>,
    pub rcode_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpFields {
    pub method: Option<String>,
    pub host: Option<String>,
    pub uri: Option<String>,
    pub status_code: Option<u16>,
    pub user_agent: Option<String>,
}

/// Kind-specific attributes of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventPayload {
    Connection(ConnectionFields),
    Ssh(SshFields),
    Dhcp(DhcpFields),
    Dns(DnsFields),
    Http(HttpFields),
    Other { path: Option<String> },
}

/// One observed network/protocol event.
///
/// Created once by the normalizer with a resolved timestamp and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub source_host: String,
    pub dest_host: String,
    pub dest_port: Option<u16>,
    pub proto: Option<String>,
    pub payload: EventPayload,
    /// Attributes without a typed home, keyed by their flattened source name.
    #[serde(default)]
    pub extra: BTreeMap<String, FieldValue>,
}

impl EventRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        source_host: impl Into<String>,
        dest_host: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            timestamp,
            source_host: source_host.into(),
            dest_host: dest_host.into(),
            dest_port: None,
            proto: None,
            payload,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.dest_port = Some(port);
        self
    }

    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = Some(proto.into());
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Connection(_) => EventKind::Connection,
            EventPayload::Ssh(_) => EventKind::Ssh,
            EventPayload::Dhcp(_) => EventKind::Dhcp,
            EventPayload::Dns(_) => EventKind::Dns,
            EventPayload::Http(_) => EventKind::Http,
            EventPayload::Other { .. } => EventKind::Other,
        }
    }

    /// Look up an attribute by its Zeek name.
    ///
    /// Typed payload fields take precedence; anything else falls through to
    /// `extra`. Returns None when the record does not carry the field.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);
        let count = |v: Option<u64>| {
            v.map(|n| match i64::try_from(n) {
                Ok(i) => FieldValue::Integer(i),
                Err(_) => FieldValue::Float(n as f64),
            })
        };
        let state = |v: &Option<ConnState>| v.as_ref().map(|s| FieldValue::Text(s.code().to_string()));

        let typed = match (name, &self.payload) {
            ("id.orig_h", _) => Some(FieldValue::Text(self.source_host.clone())),
            ("id.resp_h", _) => Some(FieldValue::Text(self.dest_host.clone())),
            ("id.resp_p", _) => self.dest_port.map(|p| FieldValue::Integer(p as i64)),
            ("proto", _) => text(&self.proto),
            ("conn_state", EventPayload::Connection(c)) => state(&c.conn_state),
            ("orig_bytes", EventPayload::Connection(c)) => count(c.orig_bytes),
            ("resp_bytes", EventPayload::Connection(c)) => count(c.resp_bytes),
            ("service", EventPayload::Connection(c)) => text(&c.service),
            ("conn_state", EventPayload::Ssh(s)) => state(&s.conn_state),
            ("auth_attempts", EventPayload::Ssh(s)) => count(s.auth_attempts.map(u64::from)),
            ("user", EventPayload::Ssh(s)) => text(&s.user),
            ("success", EventPayload::Ssh(s)) => s.success.map(FieldValue::Boolean),
            ("msg_type", EventPayload::Dhcp(d)) => text(&d.msg_type),
            ("assigned_addr", EventPayload::Dhcp(d)) => text(&d.assigned_addr),
            ("mac", EventPayload::Dhcp(d)) => text(&d.mac),
            ("hostname", EventPayload::Dhcp(d)) => text(&d.hostname),
            ("query", EventPayload::Dns(d)) => text(&d.query),
            ("qtype_name", EventPayload::Dns(d)) => text(&d.qtype_name),
            ("rcode_name", EventPayload::Dns(d)) => text(&d.rcode_name),
            ("method", EventPayload::Http(h)) => text(&h.method),
            ("host", EventPayload::Http(h)) => text(&h.host),
            ("uri", EventPayload::Http(h)) => text(&h.uri),
            ("status_code", EventPayload::Http(h)) => {
                h.status_code.map(|c| FieldValue::Integer(c as i64))
            }
            ("user_agent", EventPayload::Http(h)) => text(&h.user_agent),
            _ => None,
        };

        typed.or_else(|| self.extra.get(name).filter(|v| !v.is_null()).cloned())
    }

    /// Every present attribute: typed fields in column order, then `extra`.
    pub fn attributes(&self) -> Vec<(&str, FieldValue)> {
        let mut out: Vec<(&str, FieldValue)> = Vec::new();
        for &name in self.kind().typed_fields() {
            if let Some(value) = self.field(name) {
                out.push((name, value));
            }
        }
        for (name, value) in &self.extra {
            if !value.is_null() {
                out.push((name.as_str(), value.clone()));
            }
        }
        out
    }

    /// Numeric view of [`EventRecord::field`].
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(|v| v.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn conn(state: &str, resp: Option<u64>) -> EventRecord {
        EventRecord::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            "10.0.0.1",
            "10.0.0.2",
            EventPayload::Connection(ConnectionFields {
                conn_state: Some(state.parse().unwrap()),
                resp_bytes: resp,
                ..Default::default()
            }),
        )
    }

    #[test]
    fn conn_state_parses_known_and_unknown_codes() {
        assert_eq!("s0".parse::<ConnState>().unwrap(), ConnState::S0);
        assert_eq!("RSTO".parse::<ConnState>().unwrap(), ConnState::RSTO);
        assert_eq!(
            "XYZ".parse::<ConnState>().unwrap(),
            ConnState::Unknown("XYZ".to_string())
        );
    }

    #[test]
    fn field_accessor_resolves_typed_fields() {
        let ev = conn("S0", Some(42)).with_port(8080);
        assert_eq!(ev.kind(), EventKind::Connection);
        assert_eq!(ev.field("conn_state"), Some(FieldValue::Text("S0".into())));
        assert_eq!(ev.numeric("resp_bytes"), Some(42.0));
        assert_eq!(ev.numeric("id.resp_p"), Some(8080.0));
        assert_eq!(ev.field("orig_bytes"), None);
        assert_eq!(ev.field("query"), None);
    }

    #[test]
    fn counts_beyond_i64_stay_positive() {
        let ev = conn("SF", Some(u64::MAX));
        assert_eq!(ev.field("resp_bytes"), Some(FieldValue::Float(u64::MAX as f64)));
        assert!(ev.numeric("resp_bytes").unwrap() > 0.0);

        let edge = conn("SF", Some(i64::MAX as u64));
        assert_eq!(edge.field("resp_bytes"), Some(FieldValue::Integer(i64::MAX)));
    }

    #[test]
    fn field_accessor_falls_back_to_extra() {
        let ev = conn("SF", None)
            .with_extra("duration", FieldValue::Text("1.5".into()))
            .with_extra("tunnel_parents", FieldValue::Null);
        assert_eq!(ev.numeric("duration"), Some(1.5));
        assert_eq!(ev.field("tunnel_parents"), None);
    }

    #[test]
    fn attributes_list_typed_fields_then_extras() {
        let ev = conn("S0", Some(7))
            .with_port(445)
            .with_extra("uid", FieldValue::Text("C1".into()))
            .with_extra("tunnel_parents", FieldValue::Null);
        let names: Vec<&str> = ev.attributes().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["id.orig_h", "id.resp_h", "id.resp_p", "conn_state", "resp_bytes", "uid"]
        );
    }

    #[test]
    fn kind_from_zeek_path() {
        assert_eq!(EventKind::from_path("conn"), EventKind::Connection);
        assert_eq!(EventKind::from_path("DNS"), EventKind::Dns);
        assert_eq!(EventKind::from_path("files"), EventKind::Other);
    }
}
