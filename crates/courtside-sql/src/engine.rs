use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use courtside_core::error::Error;
use courtside_core::schema::SchemaSpec;
use courtside_core::traits::RelationalStore;
use courtside_core::types::{ConversationTurn, StructuredResult};

use crate::generator::SqlGenerator;
use crate::guard::{check_read_only, scan_writes, GuardError};

/// Generation followed by guarded execution.
pub struct StructuredQueryEngine {
    generator: SqlGenerator,
    store: Arc<dyn RelationalStore>,
}

impl StructuredQueryEngine {
    pub fn new(generator: SqlGenerator, store: Arc<dyn RelationalStore>) -> Self { Self { generator, store } }

    pub fn generator(&self) -> &SqlGenerator { &self.generator }

    /// Generation and execution failures come back as a result with
    /// `status = Error`, and empty results as `status = Empty`. A statement
    /// with a write keyword is never handed to the store and fails the
    /// request with `Error::SecurityViolation`.
    pub async fn generate_and_run(
        &self,
        question: &str,
        schema: &SchemaSpec,
        history: &[ConversationTurn],
    ) -> Result<StructuredResult, Error> {
        let start = Instant::now();
        let generated = self.generator.generate(question, schema, history).await?;
        // Text the cleanup discards (prose around a fence, a second block)
        // is still model output and is vetted too.
        if let Err(GuardError::Write { token }) = scan_writes(&generated.raw) {
            warn!(statement = %generated.raw, token = %token, "rejected non-read-only statement");
            return Err(Error::SecurityViolation { statement: generated.raw, reason: format!("forbidden keyword {token}") });
        }
        let statement = match check_read_only(&generated.sql) {
            Ok(statement) => statement.to_string(),
            Err(GuardError::Write { token }) => {
                warn!(statement = %generated.sql, token = %token, "rejected non-read-only statement");
                return Err(Error::SecurityViolation { statement: generated.sql, reason: format!("forbidden keyword {token}") });
            }
            Err(GuardError::Syntax(reason)) => {
                warn!(statement = %generated.sql, reason = %reason, "generated sql unusable");
                return Ok(StructuredResult::error(generated.sql, reason));
            }
        };

        let store = Arc::clone(&self.store);
        let to_run = statement.clone();
        let result = match tokio::task::spawn_blocking(move || store.execute(&to_run)).await {
            Ok(Ok(rows)) => StructuredResult::from_rows(statement, rows),
            Ok(Err(e)) => {
                warn!(statement = %statement, error = %e, "structured query failed");
                StructuredResult::error(statement, format!("{e:#}"))
            }
            Err(e) => StructuredResult::error(statement, format!("execution task failed: {e}")),
        };
        debug!(
            status = ?result.status,
            rows = result.rows.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "structured path"
        );
        Ok(result)
    }
}
