//! courtside-route
//!
//! Pure, text-only decisions made before any retrieval: which path(s) a
//! question needs (`classifier`), how to enrich it for embedding
//! (`expander`), which prompt variant suits it (`category`), and which
//! subject a follow-up question refers to (`subject`).

pub mod category;
pub mod classifier;
pub mod expander;
pub mod patterns;
pub mod subject;

pub use category::categorize;
pub use classifier::{classify, Classifier};
pub use expander::{expand, Expansion, QueryExpander};
pub use patterns::PatternTable;
