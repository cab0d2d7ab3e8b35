use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::Alert;

/// Separator between member descriptions in [`Episode::summary`].
pub const SUMMARY_SEPARATOR: &str = "; ";

/// A maximal run of alerts whose consecutive gaps are within the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub members: Vec<Alert>,
    pub summary: String,
}

impl Episode {
    /// Assemble an episode from an ordered, non-empty member run.
    pub(crate) fn from_members(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        members: Vec<Alert>,
    ) -> Self {
        let summary = members
            .iter()
            .map(|a| a.description())
            .collect::<Vec<_>>()
            .join(SUMMARY_SEPARATOR);
        Self {
            start,
            end,
            members,
            summary,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Builder used by the timeline stage; keeps `Episode` construction funnelled
/// through one place so the summary always matches the members.
#[derive(Debug)]
pub struct EpisodeBuilder {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    members: Vec<Alert>,
}

impl EpisodeBuilder {
    pub fn open(at: DateTime<Utc>, first: Alert) -> Self {
        Self {
            start: at,
            end: at,
            members: vec![first],
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn extend(&mut self, at: DateTime<Utc>, alert: Alert) {
        self.end = at;
        self.members.push(alert);
    }

    pub fn close(self) -> Episode {
        Episode::from_members(self.start, self.end, self.members)
    }
}

/// Tactic annotation of one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticMapping {
    pub episode_start: DateTime<Utc>,
    pub summary: String,
    pub retrieved_context: Vec<String>,
    pub mapping_text: String,
}

/// An episode whose annotation call failed or timed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingFailure {
    pub episode_start: DateTime<Utc>,
    pub error: String,
}
