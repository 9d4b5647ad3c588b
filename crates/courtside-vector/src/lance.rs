use anyhow::{Context, Result};
use arrow_array::{Array, Float32Array, Float64Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, DistanceType, Table};
use std::path::Path;
use tracing::{debug, info};

use courtside_core::error::ProviderError;
use courtside_core::traits::VectorIndex;
use courtside_core::types::IndexHit;

const PROVIDER: &str = "lancedb";

/// Read-only handle on a passages table with `text`, `source_id`, `vector`
/// and an optional numeric `boost` column.
#[derive(Clone)]
pub struct LanceVectorIndex {
    table: Table,
}

impl LanceVectorIndex {
    pub async fn open(db_path: &Path, table_name: &str) -> Result<Self> {
        let db = connect(db_path.to_string_lossy().as_ref())
            .execute()
            .await
            .with_context(|| format!("opening lancedb at {}", db_path.display()))?;
        let table = db
            .open_table(table_name)
            .execute()
            .await
            .with_context(|| format!("opening table '{table_name}'"))?;
        info!(path = %db_path.display(), table = table_name, "vector index opened");
        Ok(Self { table })
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, ProviderError> {
        let unavailable = |e: lancedb::Error| ProviderError::unavailable(PROVIDER, e.to_string());
        let mut stream = self
            .table
            .vector_search(vector.to_vec())
            .map_err(unavailable)?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(unavailable)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(unavailable)? {
            hits.extend(batch_hits(&batch).map_err(|e| ProviderError::rejected(PROVIDER, e.to_string()))?);
        }
        debug!(hits = hits.len(), k, "lancedb search");
        Ok(hits)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .with_context(|| format!("passages.{name} column missing or not utf8"))
}

fn numeric_value(column: &dyn Array, i: usize) -> Option<f32> {
    if column.is_null(i) {
        return None;
    }
    if let Some(a) = column.as_any().downcast_ref::<Float32Array>() {
        return Some(a.value(i));
    }
    column.as_any().downcast_ref::<Float64Array>().map(|a| a.value(i) as f32)
}

fn batch_hits(batch: &RecordBatch) -> Result<Vec<IndexHit>> {
    let text = string_column(batch, "text")?;
    let source = string_column(batch, "source_id")?;
    let distance = batch.column_by_name("_distance");
    let boost = batch.column_by_name("boost");
    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        // Cosine distance, so similarity is its complement.
        let score = distance.and_then(|c| numeric_value(c.as_ref(), i)).map(|d| 1.0 - d).unwrap_or(0.0);
        hits.push(IndexHit {
            text: text.value(i).to_string(),
            source_id: source.value(i).to_string(),
            score,
            boost: boost.and_then(|c| numeric_value(c.as_ref(), i)),
        });
    }
    Ok(hits)
}
