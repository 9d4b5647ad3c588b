use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use courtside_core::error::ProviderError;
use courtside_core::traits::Embedder;

use crate::client::HttpClient;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// `/embeddings` endpoint; vectors must match the index dimension.
pub struct RemoteEmbedder {
    client: HttpClient,
    model: String,
    dim: usize,
}

impl RemoteEmbedder {
    pub fn new(client: HttpClient, model: impl Into<String>, dim: usize) -> Self {
        Self { client, model: model.into(), dim }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbedRequest { model: &self.model, input: [text] };
        let resp: EmbedResponse = self.client.post_json(&self.model, "embeddings", &body).await?;
        let v = resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::rejected(&self.model, "response has no embedding"))?;
        if v.len() != self.dim {
            return Err(ProviderError::rejected(
                &self.model,
                format!("embedding has {} dims, index expects {}", v.len(), self.dim),
            ));
        }
        Ok(v)
    }
}
