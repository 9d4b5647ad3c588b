use regex::Regex;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tracing::debug;

use courtside_core::error::Error;
use courtside_core::retry::{call_with_retry, RetryPolicy};
use courtside_core::traits::CompletionModel;
use courtside_core::types::{
    AnswerOutcome, Citation, CitationKind, PathSet, QueryCategory, RetrievalPath, RetrievalSet, RoutingDecision,
    StructuredResult, SynthesizedAnswer,
};

use crate::format::{format_passages, format_structured, rendered_rows};
use crate::refusal::RefusalDetector;
use crate::templates::{select, EvidenceMode};

static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(R|S)(\d+)\]").expect("citation regex is valid"));

/// What one retrieval round produced. `None` means the path was not run.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub structured: Option<StructuredResult>,
    pub retrieved: Option<RetrievalSet>,
}

impl Evidence {
    pub fn paths(&self) -> PathSet {
        let mut p = PathSet::default();
        if self.structured.is_some() {
            p.insert(RetrievalPath::Structured);
        }
        if self.retrieved.is_some() {
            p.insert(RetrievalPath::Semantic);
        }
        p
    }

    /// Template mode and whether a two-path round ran with only one populated.
    pub fn mode(&self) -> (EvidenceMode, bool) {
        match (&self.structured, &self.retrieved) {
            (Some(s), Some(r)) => match (s.has_rows(), !r.is_empty()) {
                (true, false) => (EvidenceMode::Statistics, true),
                (false, true) => (EvidenceMode::Context, true),
                _ => (EvidenceMode::Hybrid, false),
            },
            (Some(_), None) => (EvidenceMode::Statistics, false),
            _ => (EvidenceMode::Context, false),
        }
    }
}

/// One synthesis attempt: render, complete, detect refusal, extract citations.
pub struct Synthesizer {
    model: Arc<dyn CompletionModel>,
    refusal: RefusalDetector,
    retry: RetryPolicy,
    max_rows: usize,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn CompletionModel>, refusal: RefusalDetector, retry: RetryPolicy, max_rows: usize) -> Self {
        Self { model, refusal, retry, max_rows }
    }

    pub fn prompt(&self, question: &str, evidence: &Evidence, conversation: Option<&str>, category: QueryCategory) -> String {
        let (mode, degraded) = evidence.mode();
        let mut blocks = Vec::new();
        // A degraded hybrid round shows only the populated path.
        if let Some(s) = &evidence.structured {
            if !degraded || mode == EvidenceMode::Statistics {
                blocks.push(format_structured(s, self.max_rows));
            }
        }
        if let Some(r) = &evidence.retrieved {
            if !degraded || mode == EvidenceMode::Context {
                blocks.push(format_passages(r));
            }
        }
        select(mode, category).render(question, &blocks, conversation)
    }

    /// Calls the completion model once (plus provider retries). A refusal is
    /// a normal outcome; an exhausted provider is an error.
    pub async fn answer(
        &self,
        question: &str,
        routing: &RoutingDecision,
        evidence: &Evidence,
        conversation: Option<&str>,
        category: QueryCategory,
    ) -> Result<SynthesizedAnswer, Error> {
        let start = Instant::now();
        let (mode, degraded) = evidence.mode();
        let prompt = self.prompt(question, evidence, conversation, category);
        let text = call_with_retry(&self.retry, self.model.name(), || self.model.complete(&prompt, false)).await?;
        let refused = self.refusal.is_refusal(&text);
        let citations = self.citations(&text, evidence);
        debug!(
            route = %routing.kind,
            mode = ?mode,
            refused,
            citations = citations.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "synthesis attempt"
        );
        Ok(SynthesizedAnswer {
            text: text.trim().to_string(),
            citations,
            routing: routing.clone(),
            category,
            paths_used: evidence.paths(),
            fallback_triggered: false,
            attempts: 1,
            outcome: if refused { AnswerOutcome::Refused } else { AnswerOutcome::Answered },
            degraded,
            latency: start.elapsed(),
        })
    }

    /// Markers that point at evidence actually shown, in order of first use.
    pub fn citations(&self, text: &str, evidence: &Evidence) -> Vec<Citation> {
        let rows = evidence.structured.as_ref().map_or(0, |s| if s.has_rows() { rendered_rows(s, self.max_rows) } else { 0 });
        let passages = evidence.retrieved.as_ref().map_or(&[][..], |r| r.passages.as_slice());
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for cap in CITATION.captures_iter(text) {
            let Ok(index) = cap[2].parse::<usize>() else { continue };
            if index == 0 {
                continue;
            }
            let citation = match &cap[1] {
                "R" if index <= rows => Citation { kind: CitationKind::Row, index, source_id: None },
                "S" if index <= passages.len() => {
                    Citation { kind: CitationKind::Source, index, source_id: Some(passages[index - 1].source_id.clone()) }
                }
                _ => continue,
            };
            if seen.insert((cap[1].to_string(), index)) {
                out.push(citation);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_core::types::{CellValue, RetrievedPassage, Row};

    fn evidence(rows: usize, passages: usize) -> Evidence {
        Evidence {
            structured: Some(StructuredResult::from_rows(
                "q",
                (0..rows).map(|i| Row::new(vec![("n".into(), CellValue::Integer(i as i64))])).collect(),
            )),
            retrieved: Some(RetrievalSet {
                passages: (0..passages)
                    .map(|i| RetrievedPassage { text: format!("p{i}"), source_id: format!("src{i}"), score: 0.5, boost: None })
                    .collect(),
                below_threshold: 0,
            }),
        }
    }

    #[test]
    fn degraded_when_one_side_is_empty() {
        assert_eq!(evidence(1, 2).mode(), (EvidenceMode::Hybrid, false));
        assert_eq!(evidence(0, 2).mode(), (EvidenceMode::Context, true));
        assert_eq!(evidence(3, 0).mode(), (EvidenceMode::Statistics, true));
        assert_eq!(evidence(0, 0).mode(), (EvidenceMode::Hybrid, false));
        let only_rows = Evidence { structured: evidence(1, 0).structured, retrieved: None };
        assert_eq!(only_rows.mode(), (EvidenceMode::Statistics, false));
    }
}
