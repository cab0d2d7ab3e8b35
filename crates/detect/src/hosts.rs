//! Host interaction graph and degree centrality.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use netsoc_core::EventRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostCentrality {
    pub host: String,
    pub degree: usize,
    /// `degree / (hosts - 1)`; 0 for a single-host graph.
    pub centrality: f64,
}

/// Undirected adjacency between source and destination hosts.
/// Repeated pairs collapse to one edge; self-loops are ignored.
fn adjacency(events: &[EventRecord]) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut adj: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for e in events {
        let (a, b) = (e.source_host.as_str(), e.dest_host.as_str());
        adj.entry(a).or_default();
        adj.entry(b).or_default();
        if a != b {
            adj.entry(a).or_default().insert(b);
            adj.entry(b).or_default().insert(a);
        }
    }
    adj
}

/// The `n` most connected hosts, by centrality then host name.
pub fn top_hosts(events: &[EventRecord], n: usize) -> Vec<HostCentrality> {
    let adj = adjacency(events);
    let denom = adj.len().saturating_sub(1);

    let mut ranked: Vec<HostCentrality> = adj
        .into_iter()
        .map(|(host, peers)| HostCentrality {
            host: host.to_string(),
            degree: peers.len(),
            centrality: if denom == 0 {
                0.0
            } else {
                peers.len() as f64 / denom as f64
            },
        })
        .collect();

    ranked.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.host.cmp(&b.host)));
    ranked.truncate(n);
    ranked
}
