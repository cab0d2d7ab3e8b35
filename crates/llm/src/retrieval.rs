//! Nearest-neighbour lookup over the reference corpus.
//!
//! The corpus is small and fixed, so a flat scan over normalized vectors
//! is all the index needs. Population happens once through `&mut self`;
//! afterwards the index is shared read-only.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use netsoc_ingest::embedding::{embed_in_batches, Embedder, EmbeddingError};
use netsoc_ingest::CorpusDocument;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector width {actual} does not match index width {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Context lookup capability consumed by the tactic mapper.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// At most `k` document texts, most similar first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>, RetrievalError>;
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: String,
    pub text: String,
    pub score: f32,
}

struct Entry {
    doc: CorpusDocument,
    vector: Vec<f32>,
}

pub struct RetrievalIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<Entry>,
    batch_size: usize,
}

impl RetrievalIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
            batch_size: 64,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.doc.id.as_str())
    }

    /// Embed and append documents. Insertion order is the tie-break order
    /// for equal similarities. There is no removal.
    pub async fn add_documents(&mut self, docs: Vec<CorpusDocument>) -> Result<usize, RetrievalError> {
        if docs.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        let vectors = embed_in_batches(self.embedder.as_ref(), &texts, self.batch_size).await?;

        let width = self.width().or_else(|| vectors.first().map(Vec::len));
        if let Some(expected) = width {
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
        }

        let added = docs.len();
        self.entries.extend(docs.into_iter().zip(vectors).map(|(doc, mut vector)| {
            normalize(&mut vector);
            Entry { doc, vector }
        }));

        info!(added, total = self.entries.len(), "retrieval index populated");
        Ok(added)
    }

    fn width(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.len())
    }

    /// Ranked hits with their similarity scores.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Hit>, RetrievalError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut q = self.embedder.embed(query).await?;
        if let Some(expected) = self.width().filter(|w| *w != q.len()) {
            return Err(RetrievalError::DimensionMismatch {
                expected,
                actual: q.len(),
            });
        }
        normalize(&mut q);

        let scores: Vec<f32> = self.entries.iter().map(|e| dot(&q, &e.vector)).collect();
        let hits: Vec<Hit> = rank(&scores, k)
            .into_iter()
            .map(|i| Hit {
                id: self.entries[i].doc.id.clone(),
                text: self.entries[i].doc.text.clone(),
                score: scores[i],
            })
            .collect();

        debug!(k, returned = hits.len(), "retrieval");
        Ok(hits)
    }
}

#[async_trait]
impl Retriever for RetrievalIndex {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>, RetrievalError> {
        Ok(self.search(query, k).await?.into_iter().map(|h| h.text).collect())
    }
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Cosine similarity of two already-normalized vectors. Zero vectors
/// score 0.
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Indices of the `k` best scores, descending. Stable: equal scores keep
/// index order. NaN ranks below every number.
fn rank(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (scores[a], scores[b]);
        match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        }
    });
    order.truncate(k);
    order
}
