use regex::Regex;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use courtside_core::error::Error;
use courtside_core::retry::{call_with_retry, RetryPolicy};
use courtside_core::schema::SchemaSpec;
use courtside_core::traits::CompletionModel;
use courtside_core::types::ConversationTurn;
use courtside_route::subject::{last_subject, needs_subject};
use courtside_route::PatternTable;

const EXEMPLARS: &[(&str, &str)] = &[
    (
        "Who scored the most points this season?",
        "SELECT player_name, team, points FROM player_stats WHERE season = (SELECT MAX(season) FROM player_stats) ORDER BY points DESC LIMIT 1;",
    ),
    (
        "What is Nikola Jokic's scoring average?",
        "SELECT player_name, season, ROUND(CAST(points AS REAL) / games_played, 1) AS points_per_game FROM player_stats WHERE player_name = 'Nikola Jokic' AND season = (SELECT MAX(season) FROM player_stats);",
    ),
    (
        "Which players shot the best from three this season?",
        "SELECT player_name, team, fg3m, fg3a, ROUND(CAST(fg3m AS REAL) / fg3a, 3) AS three_point_pct FROM player_stats WHERE season = (SELECT MAX(season) FROM player_stats) AND fg3a >= 200 ORDER BY three_point_pct DESC LIMIT 5;",
    ),
    (
        "How many games did the Celtics win?",
        "SELECT team_name, season, wins, losses FROM team_stats WHERE team = 'BOS' AND season = (SELECT MAX(season) FROM team_stats);",
    ),
];

const RULES: &[&str] = &[
    "Return exactly one SQLite SELECT statement and nothing else.",
    "Never modify data: no INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, PRAGMA or transactions.",
    "Per-game numbers are totals divided by games_played; never assume a precomputed average column.",
    "Before ranking by a percentage or rate, require a minimum sample: at least 200 fga, 100 fg3a, 100 fta, or 20 games_played.",
    "When the season is not specified, use the latest season in the table.",
    "Use LIMIT for rankings; default to the top 5.",
];

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("fence regex is valid"));
static LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*sql\s*:\s*").expect("label regex is valid"));

/// Renders the schema as a compact, hint-annotated listing.
pub fn describe_schema(schema: &SchemaSpec) -> String {
    let mut out = String::new();
    for table in &schema.tables {
        let _ = writeln!(out, "TABLE {} -- {}", table.name, table.description);
        for c in &table.columns {
            if c.hint.is_empty() {
                let _ = writeln!(out, "  {} {}", c.name, c.sql_type);
            } else {
                let _ = writeln!(out, "  {} {} -- {}", c.name, c.sql_type, c.hint);
            }
        }
    }
    out
}

/// Builds the generation prompt. `subject` is the entity a follow-up
/// question refers to, taken from earlier turns.
pub fn build_prompt(question: &str, schema: &SchemaSpec, subject: Option<&str>) -> String {
    let mut p = String::from("You translate basketball questions into SQLite queries.\n\nSchema:\n");
    p.push_str(&describe_schema(schema));
    p.push_str("\nRules:\n");
    for rule in RULES {
        let _ = writeln!(p, "- {rule}");
    }
    p.push_str("\nExamples:\n");
    for (q, sql) in EXEMPLARS {
        let _ = writeln!(p, "Question: {q}\nSQL: {sql}\n");
    }
    if let Some(subject) = subject {
        let _ = writeln!(p, "The question refers to {subject} from earlier in the conversation.");
    }
    let _ = write!(p, "Question: {question}\nSQL:");
    p
}

/// Strips markdown fences and a leading `SQL:` label.
pub fn clean_output(raw: &str) -> String {
    let inner = FENCE.captures(raw).and_then(|c| c.get(1)).map_or(raw, |m| m.as_str());
    LABEL.replace(inner.trim(), "").trim().to_string()
}

/// Model output as received and the statement cut out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSql {
    pub raw: String,
    pub sql: String,
}

/// Asks a deterministic completion model for one SQL statement.
pub struct SqlGenerator {
    model: Arc<dyn CompletionModel>,
    patterns: Arc<PatternTable>,
    retry: RetryPolicy,
}

impl SqlGenerator {
    pub fn new(model: Arc<dyn CompletionModel>, patterns: Arc<PatternTable>, retry: RetryPolicy) -> Self {
        Self { model, patterns, retry }
    }

    /// Subject carried over from `history` when the question has none of its own.
    pub fn carried_subject(&self, question: &str, history: &[ConversationTurn]) -> Option<String> {
        if needs_subject(question, &self.patterns) {
            last_subject(history, &self.patterns)
        } else {
            None
        }
    }

    /// Raw and cleaned output, both unvetted. Provider errors that outlast
    /// the retry budget are fatal.
    pub async fn generate(&self, question: &str, schema: &SchemaSpec, history: &[ConversationTurn]) -> Result<GeneratedSql, Error> {
        let subject = self.carried_subject(question, history);
        let prompt = build_prompt(question, schema, subject.as_deref());
        let raw = call_with_retry(&self.retry, self.model.name(), || self.model.complete(&prompt, true)).await?;
        let sql = clean_output(&raw);
        debug!(model = self.model.name(), subject = subject.as_deref(), sql = %sql, "generated sql");
        Ok(GeneratedSql { raw, sql })
    }
}
