//! Fixed-threshold detection rules.
//!
//! Every rule is an independent [`Detector`] over the whole event stream.
//! Per-event rules implement the narrower [`EventRule`] and are lifted with
//! [`PerEvent`]; batch-level rules (rogue DHCP) implement `Detector` directly.
//! Entropy scoring and IOC matching are opt-in additions to the fixed set.

mod connection;
mod dhcp;
mod dns;
mod http;
mod ioc;
mod port;
mod ssh;

pub use connection::{FailedConnection, HighDataTransfer, FAILED_STATES, HIGH_TRANSFER_BYTES};
pub use dhcp::{DhcpOffer, RogueDhcpServer};
pub use dns::{shannon_entropy, HighEntropyDnsQuery, SuspiciousDnsQuery, SUSPICIOUS_DNS_MARKERS};
pub use http::{SuspiciousHttpRequest, SUSPICIOUS_URI_MARKERS};
pub use ioc::{enrich_with_iocs, IocError, IocHit, IocList, IocMatch};
pub use port::{UnusualPort, COMMON_PORTS};
pub use ssh::{SshBruteForce, SshRecon, BRUTE_FORCE_ATTEMPTS, RECON_STATES};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::debug;

use netsoc_core::{Alert, EventRecord};

use crate::anomaly::AnomalyScorer;

/// Inputs shared by all detectors in one invocation.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext {
    /// Processing time, used by batch-level alerts that no single event owns.
    pub now: DateTime<Utc>,
}

impl DetectionContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

/// A detection rule over the full event stream.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Never fails: records missing a required field are skipped.
    fn detect(&self, events: &[EventRecord], ctx: &DetectionContext) -> Vec<Alert>;
}

/// A rule that looks at one event at a time.
pub trait EventRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, event: &EventRecord) -> Option<Alert>;
}

/// Adapter running an [`EventRule`] over every event in order.
pub struct PerEvent<R>(pub R);

impl<R: EventRule> Detector for PerEvent<R> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn detect(&self, events: &[EventRecord], _ctx: &DetectionContext) -> Vec<Alert> {
        events.iter().filter_map(|e| self.0.evaluate(e)).collect()
    }
}

/// Case-insensitive substring match against a list of lowercase markers.
pub(crate) fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// The composed detection stage.
pub struct DetectorSet {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// All fixed rules, in emission order.
    pub fn fixed_rules() -> Self {
        Self::new()
            .with(PerEvent(FailedConnection))
            .with(PerEvent(HighDataTransfer))
            .with(PerEvent(SshBruteForce))
            .with(PerEvent(SshRecon))
            .with(RogueDhcpServer)
            .with(PerEvent(SuspiciousDnsQuery))
            .with(PerEvent(SuspiciousHttpRequest))
            .with(PerEvent(UnusualPort))
    }

    /// Fixed rules followed by the adaptive volume scorer.
    pub fn standard(scorer: AnomalyScorer) -> Self {
        Self::fixed_rules().with(scorer)
    }

    pub fn with(mut self, detector: impl Detector + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector using the wall clock for batch-level alerts.
    pub fn detect(&self, events: &[EventRecord]) -> Vec<Alert> {
        self.detect_at(events, Utc::now())
    }

    /// Run every detector concurrently and merge the results.
    ///
    /// Output is stable-sorted by timestamp; equal timestamps keep detector
    /// registration order, then per-detector emission order.
    pub fn detect_at(&self, events: &[EventRecord], now: DateTime<Utc>) -> Vec<Alert> {
        let ctx = DetectionContext::at(now);

        let per_detector: Vec<Vec<Alert>> = self
            .detectors
            .par_iter()
            .map(|d| {
                let alerts = d.detect(events, &ctx);
                debug!(detector = d.name(), alerts = alerts.len(), "detector finished");
                alerts
            })
            .collect();

        let mut alerts: Vec<Alert> = per_detector.into_iter().flatten().collect();
        alerts.sort_by_key(|a| a.timestamp);
        alerts
    }
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::fixed_rules()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, TimeZone, Utc};
    use netsoc_core::*;

    pub fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    pub fn conn(secs: i64, state: &str, orig: u64, resp: u64) -> EventRecord {
        EventRecord::new(
            ts(secs),
            "10.0.0.5",
            "10.0.0.9",
            EventPayload::Connection(ConnectionFields {
                conn_state: Some(state.parse().unwrap()),
                orig_bytes: Some(orig),
                resp_bytes: Some(resp),
                service: None,
            }),
        )
    }

    pub fn ssh(secs: i64, state: Option<&str>, attempts: Option<u32>) -> EventRecord {
        EventRecord::new(
            ts(secs),
            "203.0.113.7",
            "10.0.0.2",
            EventPayload::Ssh(SshFields {
                conn_state: state.map(|s| s.parse().unwrap()),
                auth_attempts: attempts,
                ..Default::default()
            }),
        )
        .with_port(22)
    }

    pub fn dhcp(secs: i64, server: &str, msg_type: &str) -> EventRecord {
        EventRecord::new(
            ts(secs),
            "0.0.0.0",
            server,
            EventPayload::Dhcp(DhcpFields {
                msg_type: Some(msg_type.to_string()),
                ..Default::default()
            }),
        )
    }

    pub fn dns(secs: i64, query: &str) -> EventRecord {
        EventRecord::new(
            ts(secs),
            "10.0.0.5",
            "10.0.0.53",
            EventPayload::Dns(DnsFields {
                query: Some(query.to_string()),
                ..Default::default()
            }),
        )
        .with_port(53)
    }

    pub fn http(secs: i64, uri: &str) -> EventRecord {
        EventRecord::new(
            ts(secs),
            "10.0.0.5",
            "198.51.100.20",
            EventPayload::Http(HttpFields {
                uri: Some(uri.to_string()),
                ..Default::default()
            }),
        )
        .with_port(80)
    }
}
