//! Wiring shared by the `courtside` binary: argument parsing, logging setup
//! and assembly of a `Pipeline` from loaded settings.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use courtside_answer::{Pipeline, RefusalDetector, Synthesizer};
use courtside_core::config::{expand_path, EmbeddingProviderKind, Settings};
use courtside_core::traits::{CompletionModel, Embedder};
use courtside_embed::{HashEmbedder, LocalEmbedder};
use courtside_llm::{ChatCompletionModel, HttpClient, RemoteEmbedder};
use courtside_route::{Classifier, PatternTable, QueryExpander};
use courtside_sql::{SqlGenerator, SqliteConversationLog, SqliteStore, StructuredQueryEngine};
use courtside_vector::{LanceVectorIndex, SemanticRetriever};

pub const USAGE: &str = "Usage: courtside <ask|classify|expand|sql> \"<question>\" [--conversation ID] [--turn N] [--json]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Full pipeline.
    Ask { question: String, conversation: Option<String>, turn: Option<usize>, json: bool },
    /// Routing decision and category only; needs no storage or model.
    Classify { question: String },
    Expand { question: String },
    /// Generate and run the SQL for a question, no synthesis.
    Sql { question: String },
}

impl Command {
    /// Parses everything after the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((cmd, rest)) = args.split_first() else { bail!("{USAGE}") };
        let mut question: Option<String> = None;
        let mut conversation = None;
        let mut turn = None;
        let mut json = false;
        let mut i = 0;
        while i < rest.len() {
            match rest[i].as_str() {
                "--conversation" | "-c" => {
                    conversation = Some(rest.get(i + 1).context("--conversation requires an id")?.clone());
                    i += 1;
                }
                "--turn" | "-t" => {
                    let raw = rest.get(i + 1).context("--turn requires a number")?;
                    turn = Some(raw.parse::<usize>().with_context(|| format!("--turn requires a number, got '{raw}'"))?);
                    i += 1;
                }
                "--json" => json = true,
                other if other.starts_with('-') => bail!("unknown flag {other}"),
                other => {
                    question = Some(match question {
                        Some(q) => format!("{q} {other}"),
                        None => other.to_string(),
                    });
                }
            }
            i += 1;
        }
        let question = question.filter(|q| !q.trim().is_empty()).with_context(|| format!("missing question\n{USAGE}"))?;
        Ok(match cmd.as_str() {
            "ask" => Command::Ask { question, conversation, turn, json },
            "classify" => Command::Classify { question },
            "expand" => Command::Expand { question },
            "sql" => Command::Sql { question },
            other => bail!("unknown command '{other}'\n{USAGE}"),
        })
    }
}

/// Logs go to stderr so `--json` output stays clean. `COURTSIDE_LOG`
/// overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("COURTSIDE_LOG").unwrap_or_else(|_| EnvFilter::new("warn,courtside_answer=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).try_init();
}

fn http_timeout(settings: &Settings) -> Duration { Duration::from_secs(settings.retry.timeout_secs.max(1)) }

pub fn build_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let e = &settings.embedding;
    Ok(match e.provider {
        EmbeddingProviderKind::Hash => Arc::new(HashEmbedder::new(e.dim)),
        EmbeddingProviderKind::Local => Arc::new(LocalEmbedder::load(&expand_path(&e.model_dir))?),
        EmbeddingProviderKind::Remote => {
            let client = HttpClient::from_settings(&settings.llm, http_timeout(settings))?;
            Arc::new(RemoteEmbedder::new(client, e.model.clone(), e.dim))
        }
    })
}

/// Synthesis model and SQL model. The SQL model falls back to the
/// synthesis model name when `llm.sql_model` is empty.
pub fn build_models(settings: &Settings) -> Result<(Arc<dyn CompletionModel>, Arc<dyn CompletionModel>)> {
    let llm = &settings.llm;
    let client = HttpClient::from_settings(llm, http_timeout(settings))?;
    let sql_name = if llm.sql_model.trim().is_empty() { llm.model.clone() } else { llm.sql_model.clone() };
    let synth: Arc<dyn CompletionModel> = Arc::new(ChatCompletionModel::new(client.clone(), llm.model.clone(), llm.temperature));
    let sql: Arc<dyn CompletionModel> = Arc::new(ChatCompletionModel::new(client, sql_name, llm.temperature));
    Ok((synth, sql))
}

pub fn build_structured(settings: &Settings, patterns: Arc<PatternTable>, sql_model: Arc<dyn CompletionModel>) -> Result<StructuredQueryEngine> {
    let db = expand_path(&settings.storage.stats_db);
    let store = SqliteStore::open(&db, settings.retrieval.fetch_limit)?;
    Ok(StructuredQueryEngine::new(SqlGenerator::new(sql_model, patterns, settings.retry), Arc::new(store)))
}

pub fn pattern_table(settings: &Settings) -> Result<Arc<PatternTable>> {
    Ok(Arc::new(PatternTable::build(&settings.classifier).context("invalid classifier vocabulary")?))
}

/// Opens every store and model the pipeline needs. The conversation log is
/// optional; a missing database only disables follow-up context.
pub async fn build_pipeline(settings: &Settings) -> Result<Pipeline> {
    let patterns = pattern_table(settings)?;
    let (synth_model, sql_model) = build_models(settings)?;
    let structured = build_structured(settings, Arc::clone(&patterns), sql_model)?;

    let embedder = build_embedder(settings)?;
    let index = LanceVectorIndex::open(&expand_path(&settings.storage.lancedb_dir), &settings.storage.passages_table).await?;
    let retriever = SemanticRetriever::new(embedder, Arc::new(index), settings.retrieval.min_similarity, settings.retry);

    let refusal = RefusalDetector::with_extra(&settings.refusal.extra_phrases);
    let synthesizer = Synthesizer::new(synth_model, refusal, settings.retry, settings.retrieval.max_rows);

    let mut pipeline = Pipeline::new(
        Classifier::new(patterns),
        QueryExpander::default(),
        structured,
        retriever,
        synthesizer,
        settings.schema.clone(),
        settings.retrieval.clone(),
    );
    let conversations = expand_path(&settings.storage.conversations_db);
    if conversations.exists() {
        pipeline = pipeline.with_conversation_log(Arc::new(SqliteConversationLog::open(&conversations)?));
        info!(path = %conversations.display(), "conversation log attached");
    }
    Ok(pipeline)
}
