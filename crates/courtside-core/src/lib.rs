//! courtside-core
//!
//! Shared vocabulary for the question-answering pipeline: domain types, the
//! capability traits the core consumes, the error taxonomy, configuration
//! loading, and bounded retry for provider calls.

pub mod config;
pub mod error;
pub mod retry;
pub mod schema;
pub mod traits;
pub mod types;

pub use error::{Error, ProviderError, Result};
