//! Rolling z-score volume anomaly scorer.
//!
//! Complements the fixed transfer threshold: a value is anomalous when it
//! sits more than `z_threshold` sample standard deviations from the mean of
//! the trailing window that ends at it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use netsoc_core::{Alert, AlertKind, DetectionConfig, EventRecord};

use crate::detectors::{DetectionContext, Detector};

pub const DEFAULT_WINDOW: usize = 50;
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// The numeric field scored in one run. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeField {
    RespBytes,
    OrigBytes,
    /// Any other numeric attribute, looked up by Zeek name.
    Named(String),
}

impl VolumeField {
    pub fn as_str(&self) -> &str {
        match self {
            VolumeField::RespBytes => "resp_bytes",
            VolumeField::OrigBytes => "orig_bytes",
            VolumeField::Named(name) => name.as_str(),
        }
    }

    fn value(&self, event: &EventRecord) -> Option<f64> {
        event.numeric(self.as_str())
    }
}

impl FromStr for VolumeField {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "resp_bytes" => VolumeField::RespBytes,
            "orig_bytes" => VolumeField::OrigBytes,
            other => VolumeField::Named(other.to_string()),
        })
    }
}

impl fmt::Display for VolumeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScorer {
    pub field: VolumeField,
    pub window_size: usize,
    pub z_threshold: f64,
}

impl Default for AnomalyScorer {
    fn default() -> Self {
        Self {
            field: VolumeField::RespBytes,
            window_size: DEFAULT_WINDOW,
            z_threshold: DEFAULT_Z_THRESHOLD,
        }
    }
}

impl AnomalyScorer {
    pub fn new(field: VolumeField, window_size: usize, z_threshold: f64) -> Self {
        Self {
            field,
            window_size,
            z_threshold,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        let field = config
            .volume_field
            .parse()
            .unwrap_or(VolumeField::RespBytes);
        Self::new(field, config.anomaly_window, config.anomaly_z_threshold)
    }

    /// Score `events` and emit a `VolumeAnomaly` alert per outlier.
    ///
    /// Events are ordered by timestamp (stable) before scoring; events that
    /// do not carry the field are not part of the series. Positions with
    /// fewer than `window_size` earlier samples are never scored.
    pub fn score(&self, events: &[EventRecord]) -> Vec<Alert> {
        let mut series: Vec<(&EventRecord, f64)> = events
            .iter()
            .filter_map(|e| self.field.value(e).map(|v| (e, v)))
            .collect();
        series.sort_by_key(|(e, _)| e.timestamp);

        let w = self.window_size;
        if w < 2 || series.len() <= w {
            return Vec::new();
        }

        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
        let mut alerts = Vec::new();

        for i in w..values.len() {
            let window = &values[i + 1 - w..=i];
            let Some(z) = z_score(values[i], window) else {
                continue;
            };
            if z.abs() <= self.z_threshold {
                continue;
            }

            let (event, value) = series[i];
            alerts.push(Alert::new(
                AlertKind::VolumeAnomaly,
                event.timestamp,
                &event.source_host,
                &event.dest_host,
                &format!(
                    "Unusual {} volume {} from {} to {} (z={:.2})",
                    self.field, value, event.source_host, event.dest_host, z
                ),
            ));
        }

        debug!(
            field = %self.field,
            samples = values.len(),
            anomalies = alerts.len(),
            "volume scoring complete"
        );
        alerts
    }
}

impl Detector for AnomalyScorer {
    fn name(&self) -> &'static str {
        "volume_anomaly"
    }

    fn detect(&self, events: &[EventRecord], _ctx: &DetectionContext) -> Vec<Alert> {
        self.score(events)
    }
}

/// Free-function form of [`AnomalyScorer::score`].
pub fn score(
    events: &[EventRecord],
    field: VolumeField,
    window_size: usize,
    z_threshold: f64,
) -> Vec<Alert> {
    AnomalyScorer::new(field, window_size, z_threshold).score(events)
}

/// z-score of `value` against `window` using the sample standard deviation.
/// None when the variance is zero or not finite.
fn z_score(value: f64, window: &[f64]) -> Option<f64> {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if !stddev.is_finite() || stddev <= f64::EPSILON {
        return None;
    }
    Some((value - mean) / stddev)
}
