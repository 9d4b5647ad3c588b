//! Query embedders: a local BGE-M3 model and a model-free hash embedder.

pub mod device;
pub mod hash;
pub mod local;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use local::LocalEmbedder;
pub use pool::masked_mean_l2;
