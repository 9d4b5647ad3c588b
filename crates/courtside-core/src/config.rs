//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys use `__`, e.g. `APP_RETRIEVAL__TOP_K=8`). Typed sections all
//! carry defaults, so an empty configuration is valid.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::schema::SchemaSpec;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    /// Wraps an already-assembled figment, e.g. one built from a TOML string in tests.
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment.extract().map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub retry: RetryPolicy,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub storage: StorageSettings,
    pub schema: SchemaSpec,
    pub classifier: ClassifierSettings,
    pub refusal: RefusalSettings,
}

impl Settings {
    /// Checks the values a pipeline cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |msg: String| -> Result<(), Error> { Err(Error::InvalidConfig(msg)) };
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_similarity) {
            return invalid(format!("retrieval.min_similarity must lie in [0, 1], got {}", self.retrieval.min_similarity));
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1".to_string());
        }
        if self.schema.tables.is_empty() {
            return invalid("schema must describe at least one table".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Passages returned by the semantic path.
    pub top_k: usize,
    /// Advisory only; low-similarity passages are still returned.
    pub min_similarity: f32,
    /// Conversation turns rendered into the prompt.
    pub history_turns: usize,
    /// Structured rows rendered into the prompt.
    pub max_rows: usize,
    /// Rows fetched from the store before rendering.
    pub fetch_limit: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5, min_similarity: 0.35, history_turns: 5, max_rows: 20, fetch_limit: 200 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible endpoint root, e.g. `http://localhost:11434/v1`.
    pub base_url: String,
    pub model: String,
    /// Model used for SQL generation; falls back to `model` when empty.
    pub sql_model: String,
    /// Name of the env var holding the API key; unset means no auth header.
    pub api_key_env: String,
    /// Sampling temperature for non-deterministic calls.
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1:8b".to_string(),
            sql_model: String::new(),
            api_key_env: "COURTSIDE_API_KEY".to_string(),
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// Deterministic token-hash vectors; no model needed.
    Hash,
    /// Local BGE-M3 via candle.
    Local,
    /// OpenAI-compatible `/embeddings` endpoint.
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub dim: usize,
    pub model_dir: String,
    /// Remote embedding model name.
    pub model: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: EmbeddingProviderKind::Hash, dim: 1024, model_dir: "models/bge-m3".to_string(), model: "bge-m3".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub stats_db: String,
    pub lancedb_dir: String,
    pub passages_table: String,
    pub conversations_db: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            stats_db: "data/stats.sqlite".to_string(),
            lancedb_dir: "data/indexes/lancedb".to_string(),
            passages_table: "passages".to_string(),
            conversations_db: "data/conversations.sqlite".to_string(),
        }
    }
}

/// Additions to the built-in classifier vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub extra_entities: Vec<String>,
    pub extra_metrics: Vec<String>,
    pub extra_opinion_terms: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefusalSettings {
    pub extra_phrases: Vec<String>,
}

/// Expands `${VAR}`/`$VAR` and a leading `~` in a configured path. Unknown
/// variables are left as written.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_vars = shellexpand::env(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned());
    PathBuf::from(shellexpand::tilde(&with_vars).into_owned())
}
