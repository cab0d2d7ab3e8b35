//! Embedding backends for the reference corpus and episode queries.

pub mod cache;
pub mod hashing;
pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use netsoc_core::{EmbeddingConfig, LlmConfig, OllamaConfig};

pub use cache::CachingEmbedder;
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError};

/// Build the configured embedder, wrapped in the query cache.
pub fn create_embedder(
    embedding: &EmbeddingConfig,
    ollama: &OllamaConfig,
    llm: &LlmConfig,
) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    let dimensions = embedding.dimensions as usize;

    let inner: Arc<dyn Embedder> = match embedding.provider.as_str() {
        "ollama" => Arc::new(OllamaEmbedder::new(
            ollama.url.clone(),
            ollama.embedding_model.clone(),
            dimensions,
        )),
        "openai" => {
            let api_key = llm.openai_api_key.clone().ok_or_else(|| {
                EmbeddingError::Config("OPENAI_API_KEY is required for openai embeddings".into())
            })?;
            Arc::new(OpenAiEmbedder::new(
                api_key,
                embedding.openai_model.clone(),
                llm.openai_base_url.clone(),
                dimensions,
            ))
        }
        "local" => Arc::new(HashingEmbedder::new(dimensions)),
        other => {
            return Err(EmbeddingError::Config(format!(
                "unknown embedding provider: {other}"
            )))
        }
    };

    tracing::info!(
        provider = %embedding.provider,
        dimensions,
        cache = embedding.cache_capacity,
        "embedder ready"
    );
    Ok(Arc::new(CachingEmbedder::new(
        inner,
        embedding.cache_capacity as usize,
    )))
}

/// Embed `texts` in chunks of `batch_size`, preserving order.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[&str],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let vectors = embedder.embed_batch(chunk).await?;
        if vectors.len() != chunk.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunk.len(),
                actual: vectors.len(),
            });
        }
        out.extend(vectors);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn batches_preserve_order() {
        let embedder = HashingEmbedder::new(16);
        let texts = ["a", "b", "c", "d", "e"];
        let batched = embed_in_batches(&embedder, &texts, 2).await.unwrap();
        let single = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batched, single);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let embedding = EmbeddingConfig {
            provider: "bogus".into(),
            dimensions: 8,
            openai_model: String::new(),
            batch_size: 4,
            cache_capacity: 4,
        };
        let ollama = OllamaConfig {
            url: String::new(),
            model: String::new(),
            embedding_model: String::new(),
        };
        let llm = LlmConfig {
            provider: "ollama".into(),
            openai_api_key: None,
            openai_model: String::new(),
            openai_base_url: None,
            temperature: 0.1,
            max_tokens: 10,
        };
        assert!(matches!(
            create_embedder(&embedding, &ollama, &llm),
            Err(EmbeddingError::Config(_))
        ));

        let openai = EmbeddingConfig { provider: "openai".into(), ..embedding };
        assert!(matches!(
            create_embedder(&openai, &ollama, &llm),
            Err(EmbeddingError::Config(_))
        ));
    }
}
