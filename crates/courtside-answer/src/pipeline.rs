//! Per-query orchestration.
//!
//! One explicit state machine drives each request:
//!
//! ```text
//! CLASSIFIED -> RETRIEVING -> SYNTHESIZING -> DONE
//!                                   |
//!                                REFUSED -> RETRYING (at most once) -> RETRIEVING
//! ```
//!
//! Any fatal error (exhausted provider retries, a rejected statement) ends
//! the request immediately through `?`.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use courtside_core::config::RetrievalSettings;
use courtside_core::error::Error;
use courtside_core::schema::SchemaSpec;
use courtside_core::traits::ConversationLog;
use courtside_core::types::{
    AnswerOutcome, Citation, ConversationTurn, PathSet, Query, QueryCategory, RetrievalPath, RouteKind,
    SynthesizedAnswer,
};
use courtside_route::{categorize, Classifier, QueryExpander};
use courtside_sql::StructuredQueryEngine;
use courtside_vector::SemanticRetriever;

use crate::context::render_conversation;
use crate::synthesizer::{Evidence, Synthesizer};

/// Synthesis calls per query, not counting provider retries.
pub const MAX_SYNTHESIS_ATTEMPTS: usize = 2;

#[derive(Debug)]
enum Stage {
    Classified,
    Retrieving { paths: PathSet },
    Synthesizing { evidence: Evidence },
    Refused { answer: Box<SynthesizedAnswer> },
    Retrying { paths: PathSet },
    Done { answer: Box<SynthesizedAnswer> },
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Classified => "classified",
            Stage::Retrieving { .. } => "retrieving",
            Stage::Synthesizing { .. } => "synthesizing",
            Stage::Refused { .. } => "refused",
            Stage::Retrying { .. } => "retrying",
            Stage::Done { .. } => "done",
        }
    }
}

/// What a front end receives.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub answer_text: String,
    pub routing_used: RouteKind,
    pub sources_used: Vec<Citation>,
    pub paths_used: PathSet,
    pub fallback_triggered: bool,
    pub refused: bool,
    pub degraded: bool,
    pub category: QueryCategory,
    pub attempts: usize,
    pub latency_ms: u64,
}

impl From<SynthesizedAnswer> for AnswerResponse {
    fn from(a: SynthesizedAnswer) -> Self {
        Self {
            answer_text: a.text,
            routing_used: a.routing.kind,
            sources_used: a.citations,
            paths_used: a.paths_used,
            fallback_triggered: a.fallback_triggered,
            refused: a.outcome == AnswerOutcome::Refused,
            degraded: a.degraded,
            category: a.category,
            attempts: a.attempts,
            latency_ms: u64::try_from(a.latency.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Stateless per request; share it behind an `Arc`.
pub struct Pipeline {
    classifier: Classifier,
    expander: QueryExpander,
    structured: StructuredQueryEngine,
    retriever: SemanticRetriever,
    synthesizer: Synthesizer,
    schema: SchemaSpec,
    settings: RetrievalSettings,
    conversations: Option<Arc<dyn ConversationLog>>,
}

impl Pipeline {
    pub fn new(
        classifier: Classifier,
        expander: QueryExpander,
        structured: StructuredQueryEngine,
        retriever: SemanticRetriever,
        synthesizer: Synthesizer,
        schema: SchemaSpec,
        settings: RetrievalSettings,
    ) -> Self {
        Self { classifier, expander, structured, retriever, synthesizer, schema, settings, conversations: None }
    }

    pub fn with_conversation_log(mut self, log: Arc<dyn ConversationLog>) -> Self {
        self.conversations = Some(log);
        self
    }

    pub async fn route_and_answer(&self, query: &Query) -> Result<AnswerResponse, Error> {
        self.answer(query).await.map(AnswerResponse::from)
    }

    /// Runs the state machine to completion and returns the full answer record.
    pub async fn answer(&self, query: &Query) -> Result<SynthesizedAnswer, Error> {
        let start = Instant::now();
        let text = query.text();
        let routing = self.classifier.classify(text);
        let category = categorize(text, &routing);
        let history = self.history(query).await;
        let conversation = render_conversation(query, &history, self.settings.history_turns);
        info!(route = %routing.kind, category = %category, "query classified");

        let mut tried = PathSet::default();
        let mut attempts = 0usize;
        let mut fallback = false;
        let mut stage = Stage::Classified;
        loop {
            let from = stage.name();
            stage = match stage {
                Stage::Classified => Stage::Retrieving { paths: routing.initial_paths() },
                Stage::Retrieving { paths } => {
                    tried = tried.union(paths);
                    Stage::Synthesizing { evidence: self.retrieve(text, paths, &history).await? }
                }
                Stage::Synthesizing { evidence } => {
                    attempts += 1;
                    let answer = self.synthesizer.answer(text, &routing, &evidence, conversation.as_deref(), category).await?;
                    if answer.outcome == AnswerOutcome::Refused {
                        Stage::Refused { answer: Box::new(answer) }
                    } else {
                        Stage::Done { answer: Box::new(answer) }
                    }
                }
                Stage::Refused { answer } => {
                    let untried = answer.paths_used.single().map(RetrievalPath::other).filter(|p| !tried.contains(*p));
                    match untried {
                        Some(path) if !fallback && attempts < MAX_SYNTHESIS_ATTEMPTS => {
                            Stage::Retrying { paths: PathSet::only(path) }
                        }
                        _ => Stage::Done { answer },
                    }
                }
                Stage::Retrying { paths } => {
                    fallback = true;
                    info!(route = %routing.kind, paths = %paths, "refusal detected, retrying with unused path");
                    Stage::Retrieving { paths }
                }
                Stage::Done { mut answer } => {
                    answer.fallback_triggered = fallback;
                    answer.attempts = attempts;
                    answer.latency = start.elapsed();
                    info!(
                        route = %routing.kind,
                        paths = %answer.paths_used,
                        attempts,
                        fallback,
                        refused = answer.outcome == AnswerOutcome::Refused,
                        latency_ms = answer.latency.as_millis() as u64,
                        "query answered"
                    );
                    return Ok(*answer);
                }
            };
            debug!(from, to = stage.name(), attempt = attempts, "stage transition");
        }
    }

    async fn retrieve(&self, text: &str, paths: PathSet, history: &[ConversationTurn]) -> Result<Evidence, Error> {
        let structured = async {
            if paths.contains(RetrievalPath::Structured) {
                self.structured.generate_and_run(text, &self.schema, history).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let semantic = async {
            if paths.contains(RetrievalPath::Semantic) {
                let expanded = self.expander.expand(text);
                self.retriever.retrieve(&expanded.embedding_text(), self.settings.top_k).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let (structured, retrieved) = tokio::join!(structured, semantic);
        Ok(Evidence { structured: structured?, retrieved: retrieved? })
    }

    /// Recent turns, oldest first. A failing log only costs context.
    async fn history(&self, query: &Query) -> Vec<ConversationTurn> {
        let (Some(log), Some(id)) = (&self.conversations, query.conversation_id()) else {
            return Vec::new();
        };
        if query.is_first_turn() {
            return Vec::new();
        }
        let log = Arc::clone(log);
        let id = id.to_string();
        let n = self.settings.history_turns;
        match tokio::task::spawn_blocking(move || log.recent_turns(&id, n)).await {
            Ok(Ok(turns)) => turns,
            Ok(Err(e)) => {
                warn!(error = %e, "conversation log unavailable");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "conversation lookup task failed");
                Vec::new()
            }
        }
    }
}
