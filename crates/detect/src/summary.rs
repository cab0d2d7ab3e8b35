//! Per-kind alert counts for reports and API responses.

use indexmap::IndexMap;
use serde::Serialize;

use netsoc_core::{Alert, AlertKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSummary {
    pub total: usize,
    /// Keyed by kind label, in first-seen order.
    pub by_kind: IndexMap<String, usize>,
}

impl AlertSummary {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut by_kind: IndexMap<String, usize> = IndexMap::new();
        for alert in alerts {
            *by_kind.entry(alert.kind.label().to_string()).or_insert(0) += 1;
        }
        Self {
            total: alerts.len(),
            by_kind,
        }
    }

    pub fn count(&self, kind: AlertKind) -> usize {
        self.by_kind.get(kind.label()).copied().unwrap_or(0)
    }
}
