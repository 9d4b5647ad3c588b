//! Semantic retrieval over the fan-discussion passage index.
//!
//! `SemanticRetriever` embeds the expanded query text and ranks the nearest
//! passages. Two `VectorIndex` implementations ship here: `LanceVectorIndex`
//! reads an existing LanceDB table, `MemoryVectorIndex` is a brute-force
//! cosine index for tests and small corpora. Neither ever writes to storage.

pub mod lance;
pub mod memory;
pub mod retriever;

pub use lance::LanceVectorIndex;
pub use memory::MemoryVectorIndex;
pub use retriever::SemanticRetriever;
