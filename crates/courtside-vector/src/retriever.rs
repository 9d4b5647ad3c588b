use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use courtside_core::error::Error;
use courtside_core::retry::{call_with_retry, RetryPolicy};
use courtside_core::traits::{Embedder, VectorIndex};
use courtside_core::types::{RetrievalSet, RetrievedPassage};

/// Embeds expanded query text and returns the `k` nearest passages.
pub struct SemanticRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    min_similarity: f32,
    retry: RetryPolicy,
}

impl SemanticRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, min_similarity: f32, retry: RetryPolicy) -> Self {
        Self { embedder, index, min_similarity, retry }
    }

    /// Passages best first. `min_similarity` is only advisory: weak passages
    /// are kept and counted in `below_threshold`. Provider failures that
    /// outlast the retry budget are returned as `Error::Provider`.
    pub async fn retrieve(&self, expanded_text: &str, k: usize) -> Result<RetrievalSet, Error> {
        if k == 0 {
            return Ok(RetrievalSet::default());
        }
        let start = Instant::now();
        let vector = call_with_retry(&self.retry, "embedder", || self.embedder.embed(expanded_text)).await?;
        let hits = call_with_retry(&self.retry, "vector-index", || self.index.search(&vector, k)).await?;

        let mut passages: Vec<RetrievedPassage> = hits
            .into_iter()
            .map(|h| RetrievedPassage {
                text: h.text,
                source_id: h.source_id,
                score: if h.score.is_nan() { 0.0 } else { h.score.clamp(0.0, 1.0) },
                boost: h.boost,
            })
            .collect();
        passages.sort_by(|a, b| b.score.total_cmp(&a.score));
        passages.truncate(k);

        let below_threshold = passages.iter().filter(|p| p.score < self.min_similarity).count();
        debug!(
            passages = passages.len(),
            below_threshold,
            min_similarity = self.min_similarity,
            latency_ms = start.elapsed().as_millis() as u64,
            "semantic retrieval"
        );
        Ok(RetrievalSet { passages, below_threshold })
    }
}
