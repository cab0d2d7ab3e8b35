use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on `Alert::description`, truncation marker included.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

const TRUNCATION_MARKER: &str = " ...[truncated]";

/// Alert type emitted by the detection stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    FailedConnection,
    HighDataTransfer,
    SshBruteForce,
    SshRecon,
    RogueDhcpServer,
    SuspiciousDnsQuery,
    SuspiciousHttpRequest,
    VolumeAnomaly,
    UnusualPort,
    HighEntropyDnsQuery,
    IocMatch,
}

impl AlertKind {
    /// Human-readable label used in reports and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::FailedConnection => "Failed Connection",
            AlertKind::HighDataTransfer => "High Data Transfer",
            AlertKind::SshBruteForce => "SSH Brute Force",
            AlertKind::SshRecon => "SSH Recon",
            AlertKind::RogueDhcpServer => "Rogue DHCP Server",
            AlertKind::SuspiciousDnsQuery => "Suspicious DNS Query",
            AlertKind::SuspiciousHttpRequest => "Suspicious HTTP Request",
            AlertKind::VolumeAnomaly => "Volume Anomaly",
            AlertKind::UnusualPort => "Unusual Port Activity",
            AlertKind::HighEntropyDnsQuery => "High-Entropy DNS Query",
            AlertKind::IocMatch => "IOC Match",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A detection result.
///
/// The description is sanitized on construction and on deserialization,
/// so renderers never have to clean it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAlert")]
pub struct Alert {
    pub timestamp: Option<DateTime<Utc>>,
    pub kind: AlertKind,
    pub source_host: String,
    pub dest_host: String,
    description: String,
}

impl Alert {
    pub fn new(
        kind: AlertKind,
        timestamp: DateTime<Utc>,
        source_host: impl Into<String>,
        dest_host: impl Into<String>,
        description: &str,
    ) -> Self {
        Self {
            timestamp: Some(timestamp),
            kind,
            source_host: source_host.into(),
            dest_host: dest_host.into(),
            description: sanitize_description(description),
        }
    }

    /// Build an alert whose timestamp could not be resolved upstream.
    /// The timeline stage rejects these.
    pub fn unresolved(
        kind: AlertKind,
        source_host: impl Into<String>,
        dest_host: impl Into<String>,
        description: &str,
    ) -> Self {
        Self {
            timestamp: None,
            kind,
            source_host: source_host.into(),
            dest_host: dest_host.into(),
            description: sanitize_description(description),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[derive(Deserialize)]
struct RawAlert {
    timestamp: Option<DateTime<Utc>>,
    kind: AlertKind,
    source_host: String,
    dest_host: String,
    description: String,
}

impl From<RawAlert> for Alert {
    fn from(raw: RawAlert) -> Self {
        Self {
            timestamp: raw.timestamp,
            kind: raw.kind,
            source_host: raw.source_host,
            dest_host: raw.dest_host,
            description: sanitize_description(&raw.description),
        }
    }
}

/// Strip control characters, collapse whitespace runs and bound the length.
pub fn sanitize_description(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_DESCRIPTION_CHARS * 4));
    let mut pending_space = false;

    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }

    if out.chars().count() <= MAX_DESCRIPTION_CHARS {
        return out;
    }

    let keep = MAX_DESCRIPTION_CHARS - TRUNCATION_MARKER.chars().count();
    let mut truncated: String = out.chars().take(keep).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sanitize_strips_controls_and_collapses_whitespace() {
        let s = sanitize_description("  bad\u{0007}  query\t\n from \u{001b}[31mhost ");
        assert_eq!(s, "bad query from [31mhost");
    }

    #[test]
    fn sanitize_truncates_to_bound() {
        let long = "x".repeat(500);
        let s = sanitize_description(&long);
        assert_eq!(s.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(s.ends_with("...[truncated]"));
    }

    #[test]
    fn sanitize_keeps_short_text() {
        assert_eq!(sanitize_description("ok"), "ok");
        assert_eq!(sanitize_description(""), "");
    }

    #[test]
    fn deserialized_alert_is_sanitized() {
        let json = r#"{
            "timestamp": "2024-01-01T00:00:00Z",
            "kind": "UnusualPort",
            "source_host": "a",
            "dest_host": "b",
            "description": "line1\nline2\u0000"
        }"#;
        let alert: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.description(), "line1 line2");
        assert_eq!(
            alert.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }
}
