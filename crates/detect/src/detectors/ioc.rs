use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use netsoc_core::{Alert, AlertKind, EventRecord};

use super::EventRule;

#[derive(Debug, Error)]
pub enum IocError {
    #[error("cannot read IOC list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Indicators of compromise, one per line. Blank lines and `#` comments are
/// skipped; matching is a case-insensitive substring test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IocList {
    indicators: Vec<String>,
}

impl IocList {
    pub fn parse(text: &str) -> Self {
        let mut indicators: Vec<String> = Vec::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let ioc = line.to_lowercase();
            if !indicators.contains(&ioc) {
                indicators.push(ioc);
            }
        }
        Self { indicators }
    }

    pub fn load(path: &Path) -> Result<Self, IocError> {
        let text = std::fs::read_to_string(path).map_err(|source| IocError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let list = Self::parse(&text);
        info!(path = %path.display(), indicators = list.len(), "IOC list loaded");
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// First indicator found in any attribute value of `event`, with the
    /// attribute it was found in.
    pub fn first_match<'a>(&'a self, event: &'a EventRecord) -> Option<(&'a str, &'a str)> {
        if self.indicators.is_empty() {
            return None;
        }
        event.attributes().into_iter().find_map(|(field, value)| {
            let text = value.to_string().to_lowercase();
            self.indicators
                .iter()
                .find(|ioc| text.contains(ioc.as_str()))
                .map(|ioc| (ioc.as_str(), field))
        })
    }
}

/// A record flagged by the IOC list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IocHit {
    /// Position in the input slice.
    pub index: usize,
    pub indicator: String,
    pub field: String,
}

/// Flag every record carrying an indicator, in input order.
pub fn enrich_with_iocs(events: &[EventRecord], iocs: &IocList) -> Vec<IocHit> {
    events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| {
            iocs.first_match(event).map(|(indicator, field)| IocHit {
                index,
                indicator: indicator.to_string(),
                field: field.to_string(),
            })
        })
        .collect()
}

pub struct IocMatch {
    iocs: IocList,
}

impl IocMatch {
    pub fn new(iocs: IocList) -> Self {
        Self { iocs }
    }
}

impl EventRule for IocMatch {
    fn name(&self) -> &'static str {
        "ioc_match"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let (indicator, field) = self.iocs.first_match(event)?;
        Some(Alert::new(
            AlertKind::IocMatch,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!(
                "IOC {} in {} {}->{}",
                indicator, field, event.source_host, event.dest_host
            ),
        ))
    }
}
