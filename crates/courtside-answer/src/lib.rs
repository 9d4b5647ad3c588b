//! courtside-answer
//!
//! Turns retrieved evidence into a cited answer and drives the per-query
//! state machine: classify, retrieve, synthesize, and on a refusal retry
//! once with the retrieval path that has not been tried.

pub mod context;
pub mod format;
pub mod pipeline;
pub mod refusal;
pub mod synthesizer;
pub mod templates;

pub use pipeline::{AnswerResponse, Pipeline, MAX_SYNTHESIS_ATTEMPTS};
pub use refusal::RefusalDetector;
pub use synthesizer::{Evidence, Synthesizer};
pub use templates::{EvidenceMode, TemplateStyle};
