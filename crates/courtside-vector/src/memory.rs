use async_trait::async_trait;

use courtside_core::error::ProviderError;
use courtside_core::traits::VectorIndex;
use courtside_core::types::IndexHit;

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    source_id: String,
    boost: Option<f32>,
    vector: Vec<f32>,
}

/// Brute-force cosine index held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryVectorIndex {
    entries: Vec<Entry>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self { Self::default() }

    pub fn with_passage(mut self, source_id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.entries.push(Entry { text: text.into(), source_id: source_id.into(), boost: None, vector });
        self
    }

    pub fn with_boosted_passage(
        mut self,
        source_id: impl Into<String>,
        text: impl Into<String>,
        vector: Vec<f32>,
        boost: f32,
    ) -> Self {
        self.entries.push(Entry { text: text.into(), source_id: source_id.into(), boost: Some(boost), vector });
        self
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, ProviderError> {
        let mut hits: Vec<IndexHit> = self
            .entries
            .iter()
            .map(|e| IndexHit {
                text: e.text.clone(),
                source_id: e.source_id.clone(),
                score: cosine(vector, &e.vector),
                boost: e.boost,
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}
