use indexmap::IndexMap;

use netsoc_core::{Alert, AlertKind, DetectionConfig, EventPayload, EventRecord};

use super::{contains_any, EventRule};

/// Query substrings associated with tunnelling or anonymity networks.
pub const SUSPICIOUS_DNS_MARKERS: &[&str] = &["base64", ".onion", "tor"];

pub struct SuspiciousDnsQuery;

impl EventRule for SuspiciousDnsQuery {
    fn name(&self) -> &'static str {
        "suspicious_dns_query"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let EventPayload::Dns(dns) = &event.payload else {
            return None;
        };
        let query = dns.query.as_deref()?;
        if !contains_any(query, SUSPICIOUS_DNS_MARKERS) {
            return None;
        }

        Some(Alert::new(
            AlertKind::SuspiciousDnsQuery,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!("Suspicious DNS query from {}: {}", event.source_host, query),
        ))
    }
}

/// Shannon entropy of `s` in bits per character. Empty input scores 0.
pub fn shannon_entropy(s: &str) -> f64 {
    let mut counts: IndexMap<char, usize> = IndexMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let len: usize = counts.values().sum();
    if len == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / len as f64;
            p * (1.0 / p).log2()
        })
        .sum()
}

/// The label scored for randomness: the leftmost one, where DGA output and
/// tunnelled payloads land.
fn scored_label(query: &str) -> &str {
    query.trim_end_matches('.').split('.').next().unwrap_or("")
}

/// Flags queries whose leftmost label looks machine-generated.
pub struct HighEntropyDnsQuery {
    threshold: f64,
}

impl HighEntropyDnsQuery {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.dns_entropy_threshold)
    }
}

impl EventRule for HighEntropyDnsQuery {
    fn name(&self) -> &'static str {
        "high_entropy_dns_query"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let EventPayload::Dns(dns) = &event.payload else {
            return None;
        };
        let query = dns.query.as_deref()?;
        let entropy = shannon_entropy(scored_label(query));
        if entropy <= self.threshold {
            return None;
        }

        Some(Alert::new(
            AlertKind::HighEntropyDnsQuery,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!(
                "High-entropy DNS query from {} (H={:.2}): {}",
                event.source_host, entropy, query
            ),
        ))
    }
}
