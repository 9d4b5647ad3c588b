//! OpenAI-compatible HTTP adapters (`/chat/completions`, `/embeddings`).
//!
//! Works against hosted APIs and local servers such as Ollama or llama.cpp.
//! HTTP failures are classified into `ProviderError` so the shared retry
//! policy can tell throttling from a bad request.

pub mod client;
pub mod completion;
pub mod embeddings;

pub use client::HttpClient;
pub use completion::ChatCompletionModel;
pub use embeddings::RemoteEmbedder;
