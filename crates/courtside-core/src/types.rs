//! Domain types used by the routing, retrieval and synthesis crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub type SourceId = String;

/// A user question, optionally scoped to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    text: String,
    conversation_id: Option<String>,
    turn_index: Option<usize>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), conversation_id: None, turn_index: None }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>, turn_index: Option<usize>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self.turn_index = turn_index;
        self
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn conversation_id(&self) -> Option<&str> { self.conversation_id.as_deref() }
    pub fn turn_index(&self) -> Option<usize> { self.turn_index }

    /// True when there can be no prior turns to read.
    pub fn is_first_turn(&self) -> bool {
        self.conversation_id.is_none() || self.turn_index == Some(0)
    }
}

/// The classifier's verdict on which retrieval path(s) a query needs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteKind {
    Statistical,
    Contextual,
    Hybrid,
    Unknown,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteKind::Statistical => "STATISTICAL",
            RouteKind::Contextual => "CONTEXTUAL",
            RouteKind::Hybrid => "HYBRID",
            RouteKind::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Pattern families the classifier scores. The first three feed the
/// statistical score, the last two the contextual score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalFamily {
    Entity,
    Metric,
    Ranking,
    Conjunction,
    Opinion,
}

impl SignalFamily {
    pub fn is_statistical(self) -> bool {
        matches!(self, SignalFamily::Entity | SignalFamily::Metric | SignalFamily::Ranking)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchedSignal {
    pub family: SignalFamily,
    pub term: String,
}

/// Routing decision plus the trace that produced it. Computed once per
/// request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingDecision {
    pub kind: RouteKind,
    pub signals: Vec<MatchedSignal>,
    pub statistical_score: f32,
    pub contextual_score: f32,
    /// An explicit linking conjunction ("and why", "based on") was seen.
    pub linked: bool,
}

impl RoutingDecision {
    /// Paths the first synthesis attempt retrieves from. `Unknown` is
    /// treated as contextual-first; the structured path stays available
    /// as the fallback.
    pub fn initial_paths(&self) -> PathSet {
        match self.kind {
            RouteKind::Statistical => PathSet::only(RetrievalPath::Structured),
            RouteKind::Contextual | RouteKind::Unknown => PathSet::only(RetrievalPath::Semantic),
            RouteKind::Hybrid => PathSet::both(),
        }
    }

    pub fn has_family(&self, family: SignalFamily) -> bool {
        self.signals.iter().any(|s| s.family == family)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPath {
    Structured,
    Semantic,
}

impl RetrievalPath {
    pub fn other(self) -> Self {
        match self {
            RetrievalPath::Structured => RetrievalPath::Semantic,
            RetrievalPath::Semantic => RetrievalPath::Structured,
        }
    }
}

impl fmt::Display for RetrievalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { RetrievalPath::Structured => "structured", RetrievalPath::Semantic => "semantic" })
    }
}

/// A set of retrieval paths. There are only two paths, so this is a pair of flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathSet {
    pub structured: bool,
    pub semantic: bool,
}

impl PathSet {
    pub fn only(path: RetrievalPath) -> Self {
        let mut set = Self::default();
        set.insert(path);
        set
    }

    pub fn both() -> Self { Self { structured: true, semantic: true } }

    pub fn insert(&mut self, path: RetrievalPath) {
        match path {
            RetrievalPath::Structured => self.structured = true,
            RetrievalPath::Semantic => self.semantic = true,
        }
    }

    pub fn contains(&self, path: RetrievalPath) -> bool {
        match path {
            RetrievalPath::Structured => self.structured,
            RetrievalPath::Semantic => self.semantic,
        }
    }

    pub fn union(self, other: PathSet) -> PathSet {
        PathSet { structured: self.structured || other.structured, semantic: self.semantic || other.semantic }
    }

    pub fn len(&self) -> usize { usize::from(self.structured) + usize::from(self.semantic) }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// The single path in this set, if it holds exactly one.
    pub fn single(&self) -> Option<RetrievalPath> {
        match (self.structured, self.semantic) {
            (true, false) => Some(RetrievalPath::Structured),
            (false, true) => Some(RetrievalPath::Semantic),
            _ => None,
        }
    }
}

impl fmt::Display for PathSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.structured, self.semantic) {
            (true, true) => f.write_str("structured+semantic"),
            (true, false) => f.write_str("structured"),
            (false, true) => f.write_str("semantic"),
            (false, false) => f.write_str("none"),
        }
    }
}

/// A typed cell value returned by the relational store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Real(v) => {
                let s = format!("{v:.3}");
                f.write_str(s.trim_end_matches('0').trim_end_matches('.'))
            }
            CellValue::Text(v) => f.write_str(v),
        }
    }
}

/// One result row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Row {
    pub cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new(cells: Vec<(String, CellValue)>) -> Self { Self { cells } }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum StructuredStatus {
    Ok,
    Empty,
    Error(String),
}

/// Outcome of the structured path: the executed statement and its rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredResult {
    pub rows: Vec<Row>,
    pub query: String,
    pub status: StructuredStatus,
}

impl StructuredResult {
    /// Builds an `Ok` or `Empty` result depending on the row count.
    pub fn from_rows(query: impl Into<String>, rows: Vec<Row>) -> Self {
        let status = if rows.is_empty() { StructuredStatus::Empty } else { StructuredStatus::Ok };
        Self { rows, query: query.into(), status }
    }

    pub fn error(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { rows: Vec::new(), query: query.into(), status: StructuredStatus::Error(reason.into()) }
    }

    pub fn has_rows(&self) -> bool { self.status == StructuredStatus::Ok && !self.rows.is_empty() }
}

/// A raw nearest-neighbor hit as returned by a vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexHit {
    pub text: String,
    pub source_id: SourceId,
    pub score: f32,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedPassage {
    pub text: String,
    pub source_id: SourceId,
    /// Similarity in `[0, 1]`, higher is closer.
    pub score: f32,
    pub boost: Option<f32>,
}

/// Passages ranked by descending similarity. Empty is a valid outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalSet {
    pub passages: Vec<RetrievedPassage>,
    /// How many passages scored under the advisory similarity floor.
    pub below_threshold: usize,
}

impl RetrievalSet {
    pub fn is_empty(&self) -> bool { self.passages.is_empty() }
    pub fn len(&self) -> usize { self.passages.len() }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub turn_index: usize,
    pub query: String,
    pub answer: String,
    pub asked_at: Option<DateTime<Utc>>,
}

/// Coarse query style, used to pick a prompt template variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    SimpleLookup,
    Complex,
    Ambiguous,
    Noisy,
    Conversational,
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryCategory::SimpleLookup => "simple_lookup",
            QueryCategory::Complex => "complex",
            QueryCategory::Ambiguous => "ambiguous",
            QueryCategory::Noisy => "noisy",
            QueryCategory::Conversational => "conversational",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    Row,
    Source,
}

/// A `[R#]` or `[S#]` marker found in an answer, resolved against the evidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    pub kind: CitationKind,
    /// 1-based position in the rendered evidence block.
    pub index: usize,
    pub source_id: Option<SourceId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Answered,
    /// The model declined to answer from the supplied evidence; the text is
    /// the model's refusal, returned verbatim.
    Refused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedAnswer {
    pub text: String,
    pub citations: Vec<Citation>,
    pub routing: RoutingDecision,
    pub category: QueryCategory,
    pub paths_used: PathSet,
    pub fallback_triggered: bool,
    pub attempts: usize,
    pub outcome: AnswerOutcome,
    /// A hybrid request ran with only one populated path.
    pub degraded: bool,
    pub latency: Duration,
}
