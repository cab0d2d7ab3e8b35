//! SOC summary of one log family from the loaded dataset.
//!
//! Events are narrowed to a single kind and projected onto the columns an
//! analyst reads for that kind, then a CSV sample goes to the provider.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use netsoc_core::{EventKind, EventRecord, MapperConfig};

use crate::provider::{LlmError, LlmProvider, Message};

pub const DEFAULT_EVENT_FILTER: &str = "dhcp";

/// Rows of the filtered dataset included in the prompt.
pub const MAX_SAMPLE_ROWS: usize = 300;

pub const NO_DATA_SUMMARY: &str = "No data available to summarize.";

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a SOC analyst summarizing network telemetry for an incident report.";

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("unsupported event filter {0:?} (expected conn, ssh, dhcp, dns or http)")]
    UnknownFilter(String),

    #[error("completion failed: {0}")]
    Completion(#[from] LlmError),

    #[error("summary timed out after {0:?}")]
    Timeout(Duration),
}

/// Columns kept per log family, in output order.
pub fn summary_columns(kind: EventKind) -> &'static [&'static str] {
    match kind {
        EventKind::Connection => &[
            "ts", "id.orig_h", "id.resp_h", "proto", "service", "conn_state", "orig_bytes",
            "resp_bytes",
        ],
        EventKind::Ssh => &[
            "ts", "id.orig_h", "id.resp_h", "user", "auth_attempts", "success", "password",
        ],
        EventKind::Dhcp => &[
            "ts", "id.orig_h", "id.resp_h", "mac", "assigned_addr", "msg_type", "hostname",
            "vendor_class",
        ],
        EventKind::Dns => &[
            "ts", "id.orig_h", "id.resp_h", "query", "qtype_name", "answers", "rcode_name",
        ],
        EventKind::Http => &[
            "ts", "id.orig_h", "id.resp_h", "method", "host", "uri", "status_code", "user_agent",
        ],
        EventKind::Other => &[],
    }
}

/// One log family projected onto its summary columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredEvents {
    pub kind: EventKind,
    /// Summary columns that at least one row carries.
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Option<String>>>,
}

fn cell(event: &EventRecord, column: &str) -> Option<String> {
    if column == "ts" {
        return Some(event.timestamp.to_rfc3339());
    }
    event.field(column).map(|v| v.to_string())
}

/// Keep events of the kind named by `filter` (a Zeek log path, any case),
/// ordered by timestamp.
pub fn filter_events(
    events: &[EventRecord],
    filter: &str,
) -> Result<FilteredEvents, SummarizerError> {
    let kind = EventKind::from_path(filter);
    if kind == EventKind::Other {
        return Err(SummarizerError::UnknownFilter(filter.to_string()));
    }

    let mut selected: Vec<&EventRecord> = events.iter().filter(|e| e.kind() == kind).collect();
    selected.sort_by_key(|e| e.timestamp);

    let columns: Vec<&'static str> = summary_columns(kind)
        .iter()
        .copied()
        .filter(|&c| selected.iter().any(|e| cell(e, c).is_some()))
        .collect();
    let rows = selected
        .iter()
        .map(|e| columns.iter().map(|c| cell(e, c)).collect())
        .collect();

    Ok(FilteredEvents { kind, columns, rows })
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl FilteredEvents {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header plus at most `limit` rows. Missing cells are empty.
    pub fn to_csv(&self, limit: usize) -> String {
        let mut out = self.columns.join(",");
        out.push('\n');
        for row in self.rows.iter().take(limit) {
            let line: Vec<String> = row
                .iter()
                .map(|v| v.as_deref().map(csv_field).unwrap_or_default())
                .collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    pub fn stats(&self) -> SummaryStats {
        let distinct = |column: &str| -> usize {
            let Some(i) = self.columns.iter().position(|c| *c == column) else {
                return 0;
            };
            self.rows
                .iter()
                .filter_map(|r| r[i].as_deref())
                .collect::<HashSet<_>>()
                .len()
        };
        SummaryStats {
            rows: self.rows.len(),
            columns: self.columns.len(),
            unique_src: distinct("id.orig_h"),
            unique_dst: distinct("id.resp_h"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub rows: usize,
    pub columns: usize,
    pub unique_src: usize,
    pub unique_dst: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SocSummary {
    pub event_filter: String,
    pub summary: String,
    pub stats: SummaryStats,
}

pub fn summary_prompt(sample_csv: &str) -> String {
    format!(
        "Summarize these Zeek/Corelight logs for a SOC analyst. \
         Mention common event types, notable hosts, and any anomalies.\n\n{sample_csv}"
    )
}

/// Summarize the events selected by `filter`. An empty selection is answered
/// locally without calling the provider.
pub async fn summarize_events(
    events: &[EventRecord],
    filter: &str,
    provider: &dyn LlmProvider,
    config: &MapperConfig,
) -> Result<SocSummary, SummarizerError> {
    let filtered = filter_events(events, filter)?;
    let stats = filtered.stats();
    let event_filter = filtered.kind.as_str().to_string();

    if filtered.is_empty() {
        return Ok(SocSummary {
            event_filter,
            summary: NO_DATA_SUMMARY.to_string(),
            stats,
        });
    }

    let prompt = summary_prompt(&filtered.to_csv(MAX_SAMPLE_ROWS));
    let timeout = Duration::from_secs(config.timeout_secs);
    let call = provider.complete(
        vec![Message::system(SUMMARY_SYSTEM_PROMPT), Message::user(prompt)],
        config.temperature,
        config.max_tokens,
    );
    let summary = tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| SummarizerError::Timeout(timeout))??;

    info!(filter = %event_filter, rows = stats.rows, provider = provider.name(), "dataset summarized");
    Ok(SocSummary {
        event_filter,
        summary,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use netsoc_core::{DhcpFields, DnsFields, EventPayload, FieldValue};

    use super::*;
    use crate::mapper::fakes::FakeProvider;

    fn dhcp(secs: i64, server: &str, hostname: &str) -> EventRecord {
        EventRecord::new(
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            "0.0.0.0",
            server,
            EventPayload::Dhcp(DhcpFields {
                msg_type: Some("OFFER".into()),
                hostname: Some(hostname.into()),
                ..Default::default()
            }),
        )
    }

    fn dns(secs: i64, query: &str) -> EventRecord {
        EventRecord::new(
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            "10.0.0.5",
            "10.0.0.53",
            EventPayload::Dns(DnsFields {
                query: Some(query.into()),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn filter_keeps_one_kind_and_its_present_columns() {
        let events = vec![
            dhcp(20, "10.0.0.1", "laptop-7"),
            dns(5, "example.com"),
            dhcp(10, "10.0.0.66", "printer").with_extra("vendor_class", FieldValue::Text("MSFT 5.0".into())),
        ];
        let filtered = filter_events(&events, "DHCP").unwrap();

        assert_eq!(filtered.kind, EventKind::Dhcp);
        assert_eq!(
            filtered.columns,
            vec!["ts", "id.orig_h", "id.resp_h", "msg_type", "hostname", "vendor_class"]
        );
        assert_eq!(filtered.rows.len(), 2);
        assert_eq!(filtered.rows[0][2].as_deref(), Some("10.0.0.66"));
        assert_eq!(filtered.rows[1][5], None);
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let err = filter_events(&[], "files").unwrap_err();
        assert!(matches!(err, SummarizerError::UnknownFilter(f) if f == "files"));
    }

    #[test]
    fn csv_quotes_and_caps_rows() {
        let events: Vec<EventRecord> = (0..5).map(|i| dns(i, "a,b.example")).collect();
        let csv = filter_events(&events, "dns").unwrap().to_csv(3);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ts,id.orig_h,id.resp_h,query");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with(",10.0.0.5,10.0.0.53,\"a,b.example\""));
    }

    #[test]
    fn stats_count_distinct_hosts() {
        let events = vec![
            dhcp(0, "10.0.0.1", "a"),
            dhcp(1, "10.0.0.66", "b"),
            dhcp(2, "10.0.0.1", "c"),
        ];
        let stats = filter_events(&events, "dhcp").unwrap().stats();
        assert_eq!(
            stats,
            SummaryStats {
                rows: 3,
                columns: 5,
                unique_src: 1,
                unique_dst: 2,
            }
        );
    }

    #[tokio::test]
    async fn summary_prompt_carries_the_filtered_sample() {
        let provider = FakeProvider::new();
        let events = vec![dns(0, "example.com"), dhcp(1, "10.0.0.66", "rogue-box")];

        let out = summarize_events(&events, "dhcp", &provider, &MapperConfig::default())
            .await
            .unwrap();

        assert_eq!(out.event_filter, "dhcp");
        assert_eq!(out.stats.rows, 1);
        assert!(out.summary.starts_with("Discovery"));
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Summarize these Zeek/Corelight logs for a SOC analyst."));
        assert!(prompts[0].contains("rogue-box"));
        assert!(!prompts[0].contains("example.com"));
    }

    #[tokio::test]
    async fn empty_selection_skips_the_provider() {
        let provider = FakeProvider::new();
        let out = summarize_events(&[dns(0, "example.com")], "ssh", &provider, &MapperConfig::default())
            .await
            .unwrap();
        assert_eq!(out.summary, NO_DATA_SUMMARY);
        assert_eq!(out.stats.rows, 0);
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let events = vec![dhcp(0, "10.0.0.1", "failover-node")];
        let err = summarize_events(&events, "dhcp", &FakeProvider::new(), &MapperConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizerError::Completion(_)));
    }
}
