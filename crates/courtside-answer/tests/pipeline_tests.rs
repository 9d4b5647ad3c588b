use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use courtside_answer::{Pipeline, RefusalDetector, Synthesizer, MAX_SYNTHESIS_ATTEMPTS};
use courtside_core::config::RetrievalSettings;
use courtside_core::error::{Error, ProviderError};
use courtside_core::retry::RetryPolicy;
use courtside_core::schema::SchemaSpec;
use courtside_core::traits::{CompletionModel, ConversationLog, RelationalStore, VectorIndex};
use courtside_core::types::{CitationKind, ConversationTurn, IndexHit, PathSet, Query, RetrievalPath, Row, RouteKind};
use courtside_embed::HashEmbedder;
use courtside_route::{Classifier, PatternTable, QueryExpander};
use courtside_sql::{SqlGenerator, SqliteStore, StructuredQueryEngine};
use courtside_vector::{MemoryVectorIndex, SemanticRetriever};

const DIM: usize = 256;
const REFUSAL: &str = "I cannot find this information in the available data.";
const TOP_SCORER_SQL: &str = "SELECT player_name, points FROM player_stats ORDER BY points DESC LIMIT 1";
const NO_ROWS_SQL: &str = "SELECT player_name, points FROM player_stats WHERE team = 'XXX'";
const JOKIC_SQL: &str = "SELECT player_name, ROUND(CAST(points AS REAL) / games_played, 1) AS ppg FROM player_stats WHERE player_name = 'Nikola Jokic'";

const LAKERS_POSTS: &[(&str, &str)] = &[
    ("reddit:lal1", "Lakers fans think the bench is the real problem"),
    ("reddit:lal2", "Every Lakers fan I know is tired of the drama"),
    ("reddit:lal3", "Lakers fans love the AD and LeBron pairing but worry about depth"),
    ("reddit:lal4", "Think the Lakers need a real backup point guard"),
    ("reddit:lal5", "Lakers fans keep blaming the coach for the rotations"),
    ("reddit:lal6", "What the Lakers really need is shooting"),
];

const JOKIC_POSTS: &[(&str, &str)] = &[
    ("reddit:den1", "Jokic is elite because his passing makes everyone better"),
    ("reddit:den2", "Why is Jokic so good? Touch, vision, and he never rushes"),
];

/// Replays queued replies, then repeats the fallback reply.
struct ScriptedModel {
    name: &'static str,
    queue: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Result<String, ProviderError>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(name: &'static str, queue: Vec<Result<String, ProviderError>>, fallback: Result<String, ProviderError>) -> Arc<Self> {
        Arc::new(Self { name, queue: Mutex::new(queue.into()), fallback, prompts: Mutex::new(Vec::new()), calls: AtomicUsize::new(0) })
    }

    fn always(name: &'static str, reply: &str) -> Arc<Self> { Self::new(name, vec![], Ok(reply.to_string())) }

    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    fn last_prompt(&self) -> String { self.prompts.lock().unwrap().last().cloned().unwrap_or_default() }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn name(&self) -> &str { self.name }

    async fn complete(&self, prompt: &str, _deterministic: bool) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.queue.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

struct CountingStore {
    inner: SqliteStore,
    calls: AtomicUsize,
}

impl RelationalStore for CountingStore {
    fn execute(&self, q: &str) -> anyhow::Result<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(q)
    }
}

struct CountingIndex {
    inner: MemoryVectorIndex,
    calls: AtomicUsize,
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn search(&self, v: &[f32], k: usize) -> Result<Vec<IndexHit>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search(v, k).await
    }
}

struct FixedLog {
    turns: Vec<ConversationTurn>,
    calls: AtomicUsize,
}

impl ConversationLog for FixedLog {
    fn recent_turns(&self, _conversation_id: &str, n: usize) -> anyhow::Result<Vec<ConversationTurn>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.turns.iter().rev().take(n).rev().cloned().collect())
    }
}

struct Harness {
    pipeline: Pipeline,
    synth: Arc<ScriptedModel>,
    sql: Arc<ScriptedModel>,
    store: Arc<CountingStore>,
    index: Arc<CountingIndex>,
    _dir: TempDir,
}

fn fast_retry() -> RetryPolicy { RetryPolicy { max_attempts: 3, base_delay_ms: 1, max_delay_ms: 2, timeout_secs: 5 } }

/// Synthesis model that never answers.
#[derive(Default)]
struct HungModel {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionModel for HungModel {
    fn name(&self) -> &str { "hung" }

    async fn complete(&self, _prompt: &str, _deterministic: bool) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

fn harness(sql: Arc<ScriptedModel>, synth: Arc<ScriptedModel>, posts: &[(&str, &str)]) -> Harness {
    harness_with(sql, synth.clone(), synth, fast_retry(), posts)
}

/// `synth_model` is what the synthesizer calls; `synth` is only kept for inspection.
fn harness_with(
    sql: Arc<ScriptedModel>,
    synth: Arc<ScriptedModel>,
    synth_model: Arc<dyn CompletionModel>,
    synth_retry: RetryPolicy,
    posts: &[(&str, &str)],
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stats.sqlite");
    Connection::open(&db)
        .unwrap()
        .execute_batch(
            "CREATE TABLE player_stats (player_name TEXT, team TEXT, season TEXT, games_played INTEGER, points INTEGER, assists INTEGER);
             INSERT INTO player_stats VALUES ('Luka Doncic', 'DAL', '2023-24', 70, 2370, 686);
             INSERT INTO player_stats VALUES ('Nikola Jokic', 'DEN', '2023-24', 79, 2085, 708);
             INSERT INTO player_stats VALUES ('Jayson Tatum', 'BOS', '2023-24', 74, 1987, 362);",
        )
        .unwrap();
    let store = Arc::new(CountingStore { inner: SqliteStore::open(&db, 200).unwrap(), calls: AtomicUsize::new(0) });

    let embedder = HashEmbedder::new(DIM);
    let memory = posts.iter().fold(MemoryVectorIndex::new(), |idx, (id, text)| idx.with_passage(*id, *text, embedder.embed_sync(text)));
    let index = Arc::new(CountingIndex { inner: memory, calls: AtomicUsize::new(0) });

    let engine = StructuredQueryEngine::new(SqlGenerator::new(sql.clone(), PatternTable::shared_default(), fast_retry()), store.clone());
    let retriever = SemanticRetriever::new(Arc::new(embedder), index.clone(), 0.35, fast_retry());
    let synthesizer = Synthesizer::new(synth_model, RefusalDetector::default(), synth_retry, 20);
    let pipeline = Pipeline::new(
        Classifier::default(),
        QueryExpander::default(),
        engine,
        retriever,
        synthesizer,
        SchemaSpec::default(),
        RetrievalSettings::default(),
    );
    Harness { pipeline, synth, sql, store, index, _dir: dir }
}

#[tokio::test]
async fn statistical_question_cites_single_row() {
    let h = harness(
        ScriptedModel::always("sql", TOP_SCORER_SQL),
        ScriptedModel::always("synth", "Luka Doncic scored the most points, 2370 [R1]."),
        LAKERS_POSTS,
    );
    let resp = h.pipeline.route_and_answer(&Query::new("Who scored the most points this season?")).await.unwrap();

    assert_eq!(resp.routing_used, RouteKind::Statistical);
    assert_eq!(resp.paths_used, PathSet::only(RetrievalPath::Structured));
    assert_eq!(resp.sources_used.len(), 1);
    assert_eq!(resp.sources_used[0].kind, CitationKind::Row);
    assert!(!resp.fallback_triggered);
    assert!(!resp.refused);
    assert_eq!(resp.attempts, 1);
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
    assert!(h.synth.last_prompt().contains("[R1] player_name: Luka Doncic, points: 2370"));
}

#[tokio::test]
async fn contextual_question_cites_passages_without_sql() {
    let h = harness(
        ScriptedModel::always("sql", TOP_SCORER_SQL),
        ScriptedModel::always("synth", "Fans blame the bench [S1] and are tired of the drama [S2]."),
        LAKERS_POSTS,
    );
    let resp = h.pipeline.route_and_answer(&Query::new("What do fans think about the Lakers?")).await.unwrap();

    assert_eq!(resp.routing_used, RouteKind::Contextual);
    assert_eq!(resp.paths_used, PathSet::only(RetrievalPath::Semantic));
    assert_eq!(resp.sources_used.len(), 2);
    assert!(resp.sources_used.iter().all(|c| c.kind == CitationKind::Source));
    assert!(resp.sources_used.iter().all(|c| c.source_id.as_deref().is_some_and(|s| s.starts_with("reddit:lal"))));
    assert_eq!(h.sql.calls(), 0);
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
    let prompt = h.synth.last_prompt();
    assert!(prompt.contains("[S5]"), "top_k passages are shown");
    assert!(!prompt.contains("[S6]"));
}

#[tokio::test]
async fn hybrid_question_cites_row_and_source() {
    let h = harness(
        ScriptedModel::always("sql", JOKIC_SQL),
        ScriptedModel::always("synth", "Jokic averages 26.4 points [R1], and fans call his passing elite [S1]."),
        JOKIC_POSTS,
    );
    let resp = h
        .pipeline
        .route_and_answer(&Query::new("What is Nikola Jokic's scoring average and why is he elite?"))
        .await
        .unwrap();

    assert_eq!(resp.routing_used, RouteKind::Hybrid);
    assert_eq!(resp.paths_used, PathSet::both());
    assert!(!resp.degraded);
    assert!(resp.sources_used.iter().any(|c| c.kind == CitationKind::Row));
    assert!(resp.sources_used.iter().any(|c| c.kind == CitationKind::Source));
    let prompt = h.synth.last_prompt();
    assert!(prompt.contains("ppg: 26.4"));
    assert!(prompt.contains("DISCUSSION:\n[S1]"));
}

#[tokio::test]
async fn nothing_found_anywhere_refuses_after_one_fallback() {
    let h = harness(ScriptedModel::always("sql", NO_ROWS_SQL), ScriptedModel::always("synth", REFUSAL), &[]);
    let resp = h.pipeline.route_and_answer(&Query::new("Who scored the most points this season?")).await.unwrap();

    assert!(resp.refused);
    assert!(resp.fallback_triggered);
    assert_eq!(resp.answer_text, REFUSAL);
    assert_eq!(resp.attempts, MAX_SYNTHESIS_ATTEMPTS);
    assert_eq!(h.synth.calls(), 2);
    assert_eq!(resp.paths_used, PathSet::only(RetrievalPath::Semantic));
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refusal_falls_back_to_structured_path() {
    let h = harness(
        ScriptedModel::always("sql", TOP_SCORER_SQL),
        ScriptedModel::new("synth", vec![Ok(REFUSAL.to_string())], Ok("Luka Doncic, 2370 points [R1].".to_string())),
        &[],
    );
    let resp = h.pipeline.route_and_answer(&Query::new("What do fans think about the Lakers?")).await.unwrap();

    assert!(!resp.refused);
    assert!(resp.fallback_triggered);
    assert_eq!(resp.attempts, 2);
    assert_eq!(resp.paths_used, PathSet::only(RetrievalPath::Structured));
    assert_eq!(resp.sources_used[0].kind, CitationKind::Row);
    assert_eq!(h.sql.calls(), 1);
}

#[tokio::test]
async fn hybrid_refusal_has_no_unused_path() {
    let h = harness(ScriptedModel::always("sql", JOKIC_SQL), ScriptedModel::always("synth", REFUSAL), JOKIC_POSTS);
    let resp = h
        .pipeline
        .route_and_answer(&Query::new("What is Nikola Jokic's scoring average and why is he elite?"))
        .await
        .unwrap();
    assert!(resp.refused);
    assert!(!resp.fallback_triggered);
    assert_eq!(h.synth.calls(), 1);
}

#[tokio::test]
async fn hybrid_with_empty_rows_runs_degraded() {
    let h = harness(
        ScriptedModel::always("sql", NO_ROWS_SQL),
        ScriptedModel::always("synth", "Fans point to his passing [S1]."),
        JOKIC_POSTS,
    );
    let resp = h
        .pipeline
        .route_and_answer(&Query::new("What is Nikola Jokic's scoring average and why is he elite?"))
        .await
        .unwrap();
    assert!(resp.degraded);
    assert_eq!(resp.paths_used, PathSet::both());
    let prompt = h.synth.last_prompt();
    assert!(!prompt.contains("STATISTICS"), "degraded prompt only carries the populated path");
    assert!(prompt.contains("DISCUSSION:"));
}

#[tokio::test]
async fn exhausted_provider_is_fatal_and_never_falls_back() {
    let throttled = Err(ProviderError::throttled("synth", "rate limited"));
    let h = harness(ScriptedModel::always("sql", TOP_SCORER_SQL), ScriptedModel::new("synth", vec![], throttled), LAKERS_POSTS);
    let err = h.pipeline.route_and_answer(&Query::new("Who scored the most points this season?")).await.unwrap_err();

    assert!(matches!(err, Error::Provider { attempts: 3, .. }));
    assert_eq!(h.synth.calls(), 3);
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 0, "provider errors never trigger the path fallback");
}

#[tokio::test]
async fn throttling_that_clears_counts_as_one_attempt() {
    let h = harness(
        ScriptedModel::always("sql", TOP_SCORER_SQL),
        ScriptedModel::new(
            "synth",
            vec![Err(ProviderError::throttled("synth", "rate limited")), Ok("Luka Doncic [R1].".to_string())],
            Ok(REFUSAL.to_string()),
        ),
        LAKERS_POSTS,
    );
    let resp = h.pipeline.route_and_answer(&Query::new("Who scored the most points this season?")).await.unwrap();
    assert_eq!(resp.attempts, 1);
    assert_eq!(h.synth.calls(), 2);
    assert!(!resp.refused);
}

#[tokio::test]
async fn write_statement_is_security_violation() {
    let h = harness(ScriptedModel::always("sql", "DROP TABLE player_stats"), ScriptedModel::always("synth", "x"), LAKERS_POSTS);
    let err = h.pipeline.route_and_answer(&Query::new("Who scored the most points this season?")).await.unwrap_err();
    assert!(matches!(err, Error::SecurityViolation { .. }));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.synth.calls(), 0);
}

#[tokio::test]
async fn unknown_route_starts_semantic() {
    let h = harness(ScriptedModel::always("sql", TOP_SCORER_SQL), ScriptedModel::always("synth", "Here is something [S1]."), LAKERS_POSTS);
    let resp = h.pipeline.route_and_answer(&Query::new("Tell me something interesting")).await.unwrap();
    assert_eq!(resp.routing_used, RouteKind::Unknown);
    assert_eq!(resp.paths_used, PathSet::only(RetrievalPath::Semantic));
    assert_eq!(h.sql.calls(), 0);
}

fn jokic_history() -> Vec<ConversationTurn> {
    vec![ConversationTurn {
        turn_index: 0,
        query: "How many points did Nikola Jokic score?".into(),
        answer: "Nikola Jokic scored 2085 points [R1].".into(),
        asked_at: None,
    }]
}

#[tokio::test]
async fn follow_up_uses_history() {
    let h = harness(
        ScriptedModel::always("sql", "SELECT player_name, assists FROM player_stats WHERE player_name = 'Nikola Jokic'"),
        ScriptedModel::always("synth", "He had 708 assists [R1]."),
        LAKERS_POSTS,
    );
    let log = Arc::new(FixedLog { turns: jokic_history(), calls: AtomicUsize::new(0) });
    let pipeline = h.pipeline.with_conversation_log(log.clone());

    let q = Query::new("what about his assists?").in_conversation("c1", Some(1));
    let resp = pipeline.route_and_answer(&q).await.unwrap();
    assert_eq!(resp.routing_used, RouteKind::Statistical);
    assert!(h.sql.last_prompt().contains("refers to Nikola Jokic"));
    assert!(h.synth.last_prompt().contains("CONVERSATION SO FAR:\nUser: How many points did Nikola Jokic score?"));
    assert_eq!(log.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn first_turn_skips_history() {
    let h = harness(ScriptedModel::always("sql", TOP_SCORER_SQL), ScriptedModel::always("synth", "Luka [R1]."), LAKERS_POSTS);
    let log = Arc::new(FixedLog { turns: jokic_history(), calls: AtomicUsize::new(0) });
    let pipeline = h.pipeline.with_conversation_log(log.clone());

    let q = Query::new("Who scored the most points this season?").in_conversation("c1", Some(0));
    pipeline.route_and_answer(&q).await.unwrap();
    assert!(!h.synth.last_prompt().contains("CONVERSATION SO FAR"));
    assert_eq!(log.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hung_synthesis_times_out_without_fallback() {
    let hung = Arc::new(HungModel::default());
    let retry = RetryPolicy { max_attempts: 2, base_delay_ms: 1, max_delay_ms: 1, timeout_secs: 1 };
    let h = harness_with(
        ScriptedModel::always("sql", TOP_SCORER_SQL),
        ScriptedModel::always("unused", REFUSAL),
        hung.clone(),
        retry,
        LAKERS_POSTS,
    );
    let err = h.pipeline.route_and_answer(&Query::new("Who scored the most points this season?")).await.unwrap_err();

    assert!(matches!(err, Error::Provider { attempts: 2, source: ProviderError::Timeout { .. } }), "{err:?}");
    assert_eq!(hung.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 0, "a timeout is not a refusal");
}
