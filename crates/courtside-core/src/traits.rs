//! Capabilities the core consumes. Implementations live in the adapter
//! crates; tests supply scripted fakes.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{ConversationTurn, IndexHit, Row};

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest neighbours of `vector`, best first, at most `k`.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, ProviderError>;
}

pub trait RelationalStore: Send + Sync {
    /// Runs a statement that has already passed the read-only guard.
    fn execute(&self, read_only_query: &str) -> anyhow::Result<Vec<Row>>;
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
    fn name(&self) -> &str;
    /// `deterministic` asks the provider for temperature-zero sampling.
    async fn complete(&self, prompt: &str, deterministic: bool) -> Result<String, ProviderError>;
}

pub trait ConversationLog: Send + Sync {
    /// The most recent `n` turns of a conversation, oldest first.
    fn recent_turns(&self, conversation_id: &str, n: usize) -> anyhow::Result<Vec<ConversationTurn>>;
}
