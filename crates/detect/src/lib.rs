//! Detection and temporal correlation over normalized network telemetry.
//!
//! - Fixed-rule detectors (failed connections, SSH, DHCP, DNS, HTTP, ports)
//! - DNS label entropy scoring and IOC list matching
//! - Rolling z-score volume anomaly scorer
//! - Gap-based timeline builder grouping alerts into episodes
//! - Offline helpers: keyword technique hints, host centrality, alert summary

pub mod anomaly;
pub mod detectors;
pub mod hosts;
pub mod pipeline;
pub mod summary;
pub mod technique;
pub mod timeline;

pub use anomaly::{AnomalyScorer, VolumeField};
pub use detectors::{
    enrich_with_iocs, shannon_entropy, DetectionContext, Detector, DetectorSet, EventRule, IocList,
};
pub use pipeline::{build_timeline, generate_alerts, generate_alerts_with_iocs};
pub use timeline::{TimelineBuilder, TimelineError};
