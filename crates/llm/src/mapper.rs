//! Retrieval-augmented tactic annotation of episodes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use netsoc_core::{Episode, MapperConfig, MappingFailure, TacticMapping};

use crate::provider::{LlmError, LlmProvider, Message};
use crate::retrieval::{RetrievalError, Retriever};

pub const SYSTEM_PROMPT: &str =
    "You are a SOC analyst. You map network activity to MITRE ATT&CK tactics.";

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("context retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("completion failed: {0}")]
    Completion(#[from] LlmError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// The annotation request for one episode.
pub fn annotation_prompt(summary: &str, context: &[String]) -> String {
    format!(
        "Analyze this network activity:\n{summary}\n\nContext:\n{}\n\n\
         Label with 1-2 MITRE ATT&CK tactics and briefly justify.",
        context.join("\n")
    )
}

/// Outcome of mapping a batch: successes and failures, each in episode order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TacticMappings {
    pub mapped: Vec<TacticMapping>,
    pub failed: Vec<MappingFailure>,
}

impl TacticMappings {
    /// Successful mappings keyed by episode start.
    pub fn by_start(&self) -> BTreeMap<DateTime<Utc>, TacticMapping> {
        self.mapped
            .iter()
            .map(|m| (m.episode_start, m.clone()))
            .collect()
    }
}

pub struct TacticMapper {
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn LlmProvider>,
    top_k: usize,
    concurrency: usize,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl TacticMapper {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn LlmProvider>,
        config: &MapperConfig,
    ) -> Self {
        Self {
            retriever,
            provider,
            top_k: config.top_k,
            concurrency: config.concurrency.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Override the per-episode timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retrieve context for one episode and ask the provider for a label.
    /// Errors are returned as-is; nothing is retried.
    pub async fn map_episode(&self, episode: &Episode) -> Result<TacticMapping, MapperError> {
        let context = self.retriever.retrieve(&episode.summary, self.top_k).await?;
        let prompt = annotation_prompt(&episode.summary, &context);

        let mapping_text = self
            .provider
            .complete(
                vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
                self.temperature,
                self.max_tokens,
            )
            .await?;

        debug!(start = %episode.start, context = context.len(), "episode mapped");
        Ok(TacticMapping {
            episode_start: episode.start,
            summary: episode.summary.clone(),
            retrieved_context: context,
            mapping_text,
        })
    }

    async fn map_with_timeout(&self, episode: &Episode) -> Result<TacticMapping, MapperError> {
        match tokio::time::timeout(self.timeout, self.map_episode(episode)).await {
            Ok(result) => result,
            Err(_) => Err(MapperError::Timeout(self.timeout)),
        }
    }

    /// Map every episode with at most `concurrency` calls in flight.
    /// A failed or timed-out episode lands in `failed`; the rest continue.
    pub async fn map_all(&self, episodes: &[Episode]) -> TacticMappings {
        let results: Vec<(DateTime<Utc>, Result<TacticMapping, MapperError>)> =
            stream::iter(episodes.to_vec())
                .map(|ep| {
                    async move {
                        let result = self.map_with_timeout(&ep).await;
                        (ep.start, result)
                    }
                    .boxed()
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut out = TacticMappings::default();
        for (episode_start, result) in results {
            match result {
                Ok(mapping) => out.mapped.push(mapping),
                Err(e) => {
                    warn!(start = %episode_start, error = %e, "episode mapping failed");
                    out.failed.push(MappingFailure {
                        episode_start,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            provider = self.provider.name(),
            mapped = out.mapped.len(),
            failed = out.failed.len(),
            "tactic mapping complete"
        );
        out
    }
}

/// Map a batch of episodes with the given capabilities.
pub async fn map_episodes_to_tactics(
    episodes: &[Episode],
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn LlmProvider>,
    config: &MapperConfig,
) -> TacticMappings {
    TacticMapper::new(retriever, provider, config)
        .map_all(episodes)
        .await
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use netsoc_core::{Alert, AlertKind, EpisodeBuilder};

    use super::*;

    pub struct FakeRetriever {
        pub docs: Vec<String>,
        pub queries: Mutex<Vec<(String, usize)>>,
    }

    impl FakeRetriever {
        pub fn new(docs: &[&str]) -> Self {
            Self {
                docs: docs.iter().map(|d| d.to_string()).collect(),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Retriever for FakeRetriever {
        async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>, RetrievalError> {
            self.queries.lock().unwrap().push((query.to_string(), k));
            Ok(self.docs.iter().take(k).cloned().collect())
        }
    }

    /// Echoes the prompt. Summaries containing "fail" error out, "slow"
    /// sleeps far past any test timeout.
    pub struct FakeProvider {
        pub prompts: Mutex<Vec<String>>,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub delay: Duration,
    }

    impl FakeProvider {
        pub fn new() -> Self {
            Self::with_delay(Duration::ZERO)
        }

        pub fn with_delay(delay: Duration) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if prompt.contains("slow") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            } else if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if prompt.contains("fail") {
                return Err(LlmError::ApiError {
                    status: 500,
                    body: "backend down".into(),
                });
            }
            Ok(format!("Discovery ({} chars)", prompt.len()))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    pub fn episode(secs: i64, description: &str) -> Episode {
        let at = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        let alert = Alert::new(AlertKind::UnusualPort, at, "10.0.0.5", "10.0.0.9", description);
        EpisodeBuilder::open(at, alert).close()
    }
}
