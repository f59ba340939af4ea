//! Query embedding and similarity retrieval.

use std::sync::Arc;
use std::time::Duration;

use quarry_core::{Embedding, EmbeddingModel, ProviderError};
use tracing::{debug, warn};

use crate::config::{RagConfig, RetryPolicy};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::persistence::Snapshot;
use crate::types::SearchResult;

/// Embeds `texts` under a deadline, retrying transient failures.
///
/// Each attempt runs under `timeout`; expiry counts as [`ProviderError::Timeout`]. A
/// response with the wrong number of vectors is rejected as
/// [`ProviderError::InvalidResponse`] and not retried.
pub(crate) async fn embed_with_retry<E: EmbeddingModel>(
    embedder: &E,
    texts: &[String],
    timeout: Duration,
    policy: &RetryPolicy,
) -> std::result::Result<Vec<Embedding>, ProviderError> {
    let mut attempt = 0;
    loop {
        let outcome = tokio::time::timeout(timeout, embedder.embed_batch(texts))
            .await
            .unwrap_or_else(|_| Err(ProviderError::Timeout(timeout)));

        let err = match outcome {
            Ok(vectors) if vectors.len() == texts.len() => return Ok(vectors),
            Ok(vectors) => {
                return Err(ProviderError::InvalidResponse(format!(
                    "{} vectors returned for {} inputs",
                    vectors.len(),
                    texts.len()
                )));
            }
            Err(err) => err,
        };

        if !err.is_transient() || attempt >= policy.max_retries {
            return Err(err);
        }
        let delay = policy.delay_for(&err, attempt);
        attempt += 1;
        warn!(
            attempt,
            max_retries = policy.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "embedding call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Finds the passages most similar to a question.
#[derive(Debug)]
pub struct Retriever<E> {
    embedder: Arc<E>,
    timeout: Duration,
    retry: RetryPolicy,
    threshold: Option<f32>,
}

impl<E: EmbeddingModel> Retriever<E> {
    /// Creates a retriever using the embedding settings of `config`.
    #[must_use]
    pub fn new(embedder: Arc<E>, config: &RagConfig) -> Self {
        Self {
            embedder,
            timeout: config.embed_timeout,
            retry: config.retry.clone(),
            threshold: config.similarity_threshold,
        }
    }

    /// Returns up to `k` passages from `snapshot`, best first.
    ///
    /// `k` is clamped to the number of indexed chunks.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotReady`] when there is no snapshot.
    /// - [`RagError::Embedding`] when the question cannot be embedded.
    /// - [`RagError::DimensionMismatch`] when the provider's vectors do not fit the index.
    pub async fn retrieve(
        &self,
        snapshot: Option<&Snapshot>,
        question: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let snapshot = snapshot.ok_or(RagError::IndexNotReady)?;
        let index = snapshot.index();
        let k = k.min(index.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = embed_with_retry(
            self.embedder.as_ref(),
            &[question.to_owned()],
            self.timeout,
            &self.retry,
        )
        .await
        .map_err(RagError::Embedding)?
        .pop()
        .ok_or_else(|| {
            RagError::Embedding(ProviderError::InvalidResponse("no query vector".into()))
        })?;

        let mut hits = index.search(&query, k)?;
        if let Some(threshold) = self.threshold {
            hits.retain(|hit| hit.score >= threshold);
        }
        debug!(
            version = snapshot.version(),
            k,
            hits = hits.len(),
            "retrieved passages"
        );
        Ok(hits)
    }
}
