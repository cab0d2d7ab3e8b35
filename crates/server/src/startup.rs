//! Server startup: capability construction and retrieval index seeding.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing::{info, warn};

use netsoc_core::Config;
use netsoc_detect::IocList;
use netsoc_ingest::embedding::create_embedder;
use netsoc_ingest::{load_corpus, tactic_seeds, CorpusDocument};
use netsoc_llm::{create_provider, RetrievalIndex};

use crate::state::{AppState, RunCache};

/// Tactic seeds plus the corpus directory. An unreadable corpus falls back
/// to the seeds alone.
fn corpus_documents(config: &Config) -> Vec<CorpusDocument> {
    let dir = &config.data.corpus_dir;
    load_corpus(dir).unwrap_or_else(|e| {
        warn!(dir = %dir.display(), error = %e, "corpus unreadable, using tactic seeds only");
        tactic_seeds()
    })
}

/// The IOC list is optional: a missing file disables IOC matching and an
/// unreadable one is logged and skipped.
fn ioc_list(config: &Config) -> Option<Arc<IocList>> {
    let path = &config.data.ioc_path;
    if !path.is_file() {
        info!(path = %path.display(), "no IOC list, IOC matching disabled");
        return None;
    }
    match IocList::load(path) {
        Ok(list) if !list.is_empty() => Some(Arc::new(list)),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "IOC list unreadable, IOC matching disabled");
            None
        }
    }
}

/// Build `AppState`: embedder, seeded retrieval index, the optional IOC list
/// and (if configured) the completion provider.
pub async fn build_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let embedder = create_embedder(&config.embedding, &config.ollama, &config.llm)
        .context("embedding backend")?;

    let mut index = RetrievalIndex::new(embedder)
        .with_batch_size(config.embedding.batch_size as usize);
    let corpus_documents = index
        .add_documents(corpus_documents(&config))
        .await
        .context("seeding retrieval index")?;
    info!(documents = corpus_documents, "retrieval index ready");

    let provider = match create_provider(&config.llm, &config.ollama) {
        Ok(p) => {
            info!(provider = p.name(), "LLM provider ready");
            Some(p)
        }
        Err(e) => {
            warn!(error = %e, "LLM provider not available, /mapper, /reporter and /summarizer disabled");
            None
        }
    };

    let iocs = ioc_list(&config);

    Ok(Arc::new(AppState {
        config,
        retriever: Arc::new(index),
        provider,
        corpus_documents,
        iocs,
        runs: RwLock::new(RunCache::default()),
    }))
}
