//! Query routing.
//!
//! Two independent scores are computed from the pattern families: a
//! statistical score (entities, metrics, ranking verbs) and a contextual
//! score (linking conjunctions, opinion and explanation vocabulary). Each
//! family contributes its weight at most once, however many of its terms
//! match.
//!
//! | statistical | contextual | linking conjunction | decision    |
//! |-------------|------------|---------------------|-------------|
//! | yes         | no         | -                   | STATISTICAL |
//! | no          | yes        | no                  | CONTEXTUAL  |
//! | yes / named entity | yes | yes                 | HYBRID      |
//! | yes         | yes        | no                  | STATISTICAL |
//! | no          | no         | -                   | UNKNOWN     |
//!
//! The statistical side counts as present when a metric matched, or when a
//! named entity and a ranking verb both matched. A named entity alone is
//! enough for HYBRID once a linking conjunction is present.

use std::sync::Arc;
use tracing::debug;

use courtside_core::types::{MatchedSignal, RouteKind, RoutingDecision, SignalFamily};

use crate::patterns::PatternTable;

const CONTEXTUAL_THRESHOLD: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct Classifier {
    table: Arc<PatternTable>,
}

impl Default for Classifier {
    fn default() -> Self { Self::new(PatternTable::shared_default()) }
}

impl Classifier {
    pub fn new(table: Arc<PatternTable>) -> Self { Self { table } }

    pub fn table(&self) -> &PatternTable { &self.table }

    /// Pure function of the text: no conversation state is consulted.
    pub fn classify(&self, query: &str) -> RoutingDecision {
        let mut signals = Vec::new();
        let mut statistical_score = 0.0f32;
        let mut contextual_score = 0.0f32;

        for family in self.table.families() {
            let before = signals.len();
            for entry in &family.entries {
                if entry.regex.is_match(query) {
                    signals.push(MatchedSignal { family: family.family, term: entry.label.clone() });
                }
            }
            if signals.len() > before {
                if family.family.is_statistical() {
                    statistical_score += family.weight;
                } else {
                    contextual_score += family.weight;
                }
            }
        }

        let has = |f: SignalFamily| signals.iter().any(|s| s.family == f);
        let entity = has(SignalFamily::Entity);
        let statistical = has(SignalFamily::Metric) || (entity && has(SignalFamily::Ranking));
        let contextual = contextual_score >= CONTEXTUAL_THRESHOLD;
        let linked = has(SignalFamily::Conjunction);

        let kind = match (statistical, contextual) {
            (_, true) if linked && (statistical || entity) => RouteKind::Hybrid,
            (true, _) => RouteKind::Statistical,
            (false, true) => RouteKind::Contextual,
            (false, false) => RouteKind::Unknown,
        };
        debug!(route = %kind, statistical_score, contextual_score, linked, signals = signals.len(), "classified query");
        RoutingDecision { kind, signals, statistical_score, contextual_score, linked }
    }
}

/// Classifies with the built-in pattern table.
pub fn classify(query: &str) -> RoutingDecision { Classifier::default().classify(query) }
