//! Incident report model and its plain-text line formats.

use serde::Serialize;

use netsoc_core::{Alert, Episode};
use netsoc_detect::hosts::HostCentrality;
use netsoc_detect::summary::AlertSummary;
use netsoc_detect::technique;
use netsoc_ingest::DatasetStats;
use netsoc_llm::TacticMappings;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
pub struct Report {
    pub source: String,
    pub stats: DatasetStats,
    pub summary: AlertSummary,
    pub alerts: Vec<Alert>,
    pub episodes: Vec<Episode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<TacticMappings>,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub source: String,
    pub stats: DatasetStats,
    pub top_hosts: Vec<HostCentrality>,
}

/// `  1. 2024-01-01 00:00:00 | Failed Connection | src=a -> dst=b | ...`
pub fn timeline_line(number: usize, alert: &Alert) -> String {
    let ts = alert
        .timestamp
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>3}. {} | {} | src={} -> dst={} | {}",
        number,
        ts,
        alert.kind.label(),
        alert.source_host,
        alert.dest_host,
        alert.description()
    )
}

/// `Episode 2: 2024-01-01 00:00:00 -> 2024-01-01 00:01:10 (3 alerts)`
pub fn episode_header(number: usize, episode: &Episode) -> String {
    format!(
        "Episode {}: {} -> {} ({} alert{})",
        number,
        episode.start.format(TIME_FORMAT),
        episode.end.format(TIME_FORMAT),
        episode.len(),
        if episode.len() == 1 { "" } else { "s" }
    )
}

/// Distinct keyword technique labels across an episode's members.
pub fn episode_techniques(episode: &Episode) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for alert in &episode.members {
        let label = technique::label(alert.description());
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

pub fn time_range(stats: &DatasetStats) -> String {
    match (stats.first_seen, stats.last_seen) {
        (Some(first), Some(last)) => format!(
            "{} -> {}",
            first.format(TIME_FORMAT),
            last.format(TIME_FORMAT)
        ),
        _ => "-".to_string(),
    }
}
