//! Gap-based temporal clustering of alerts into episodes.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::debug;

use netsoc_core::{Alert, Episode, EpisodeBuilder};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimelineError {
    #[error("alert at index {index} has no resolved timestamp")]
    UnresolvedTimestamp { index: usize },

    #[error("alert at index {index} is earlier than its predecessor")]
    OutOfOrder { index: usize },

    #[error("gap must not be negative (got {0}s)")]
    NegativeGap(i64),
}

/// Single-pass episode builder over a timestamp-ordered alert sequence.
#[derive(Debug, Clone, Copy)]
pub struct TimelineBuilder {
    gap: Duration,
}

impl TimelineBuilder {
    pub fn new(gap_seconds: i64) -> Result<Self, TimelineError> {
        if gap_seconds < 0 {
            return Err(TimelineError::NegativeGap(gap_seconds));
        }
        // Gaps beyond the representable range behave as "never split".
        let gap = Duration::try_seconds(gap_seconds).unwrap_or(Duration::MAX);
        Ok(Self { gap })
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }

    /// Group `alerts` into gap-disjoint episodes.
    ///
    /// Every alert must carry a timestamp and the sequence must be
    /// non-decreasing; both are checked before any clustering happens.
    pub fn build(&self, alerts: &[Alert]) -> Result<Vec<Episode>, TimelineError> {
        let stamps = check_preconditions(alerts)?;

        let mut episodes = Vec::new();
        let mut open: Option<EpisodeBuilder> = None;

        for (alert, at) in alerts.iter().zip(stamps) {
            match open.as_mut() {
                Some(current) if at - current.end() <= self.gap => {
                    current.extend(at, alert.clone());
                }
                _ => {
                    if let Some(done) = open.take() {
                        episodes.push(done.close());
                    }
                    open = Some(EpisodeBuilder::open(at, alert.clone()));
                }
            }
        }
        if let Some(done) = open {
            episodes.push(done.close());
        }

        debug!(
            alerts = alerts.len(),
            episodes = episodes.len(),
            gap_secs = self.gap.num_seconds(),
            "timeline built"
        );
        Ok(episodes)
    }
}

fn check_preconditions(alerts: &[Alert]) -> Result<Vec<DateTime<Utc>>, TimelineError> {
    let mut stamps = Vec::with_capacity(alerts.len());
    for (index, alert) in alerts.iter().enumerate() {
        let at = alert
            .timestamp
            .ok_or(TimelineError::UnresolvedTimestamp { index })?;
        if stamps.last().is_some_and(|prev| at < *prev) {
            return Err(TimelineError::OutOfOrder { index });
        }
        stamps.push(at);
    }
    Ok(stamps)
}
