use thiserror::Error;

/// Failure of an external capability call (embedding, vector search,
/// completion). Only transient variants are retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} throttled: {message}")]
    Throttled { provider: String, message: String },

    #[error("{provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },

    #[error("{provider} timed out after {after_ms} ms")]
    Timeout { provider: String, after_ms: u64 },

    #[error("{provider} rejected the request: {message}")]
    Rejected { provider: String, message: String },
}

impl ProviderError {
    pub fn throttled(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Throttled { provider: provider.into(), message: message.into() }
    }

    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable { provider: provider.into(), message: message.into() }
    }

    pub fn rejected(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected { provider: provider.into(), message: message.into() }
    }

    pub fn is_transient(&self) -> bool {
        !matches!(self, ProviderError::Rejected { .. })
    }

    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Throttled { provider, .. }
            | ProviderError::Unavailable { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Rejected { provider, .. } => provider,
        }
    }
}

/// Fatal per-request errors. Everything else (empty results, failed
/// generation, refusals) is reported inside a normal answer.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings that load but cannot drive a pipeline.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider call failed after {attempts} attempt(s): {source}")]
    Provider {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("Security violation: {reason}; statement rejected: {statement}")]
    SecurityViolation { statement: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
