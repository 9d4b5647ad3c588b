//! The structured retrieval path: prompt a model for one read-only SQL
//! statement, vet it, and run it against the stats database.
//!
//! - `generator`: prompt assembly and output cleanup
//! - `guard`: the read-only check every statement passes before execution
//! - `store`: read-only SQLite `RelationalStore`
//! - `conversation`: SQLite-backed `ConversationLog` reader
//! - `engine`: `generate_and_run`, tying the above together

pub mod conversation;
pub mod engine;
pub mod generator;
pub mod guard;
pub mod store;

pub use conversation::SqliteConversationLog;
pub use engine::StructuredQueryEngine;
pub use generator::{GeneratedSql, SqlGenerator};
pub use guard::{check_read_only, scan_writes, GuardError};
pub use store::SqliteStore;
