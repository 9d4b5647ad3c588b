//! Prompt templates keyed by (evidence mode, query category).

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use courtside_core::types::QueryCategory;

/// Which evidence the prompt carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceMode {
    Statistics,
    Context,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStyle {
    Standard,
    /// Every claim cited; used when the question itself is unclear.
    Strict,
    Light,
    CitationLight,
}

pub struct Template {
    pub mode: EvidenceMode,
    pub style: TemplateStyle,
    pub grounding: &'static str,
    pub tone: &'static str,
}

const REFUSAL_RULE: &str =
    "If the evidence does not answer the question, say \"I cannot find this information in the available data.\" and nothing else.";

const STATS: &str = "Answer using only the STATISTICS rows below. Every number you state must be followed by its row marker, e.g. [R1].";
const CONTEXT: &str = "Answer using only the DISCUSSION passages below; they are fan opinions, so attribute them (\"fans argue...\"). Cite passages by marker, e.g. [S2].";
const HYBRID: &str = "Answer using the STATISTICS rows for facts and the DISCUSSION passages for explanation and opinion. Cite numbers with row markers like [R1] and opinions with passage markers like [S1].";

const STANDARD: &str = "Write a short, direct paragraph.";
const STRICT: &str = "The question may be unclear. State which reading you answered, and put a citation on every sentence; do not add anything the evidence does not show.";
const LIGHT: &str = "Answer in one sentence with the key number or fact and its citation.";
const CITATION_LIGHT: &str = "Reply in a relaxed, conversational tone. Cite only the central fact or opinion.";

static TEMPLATES: [Template; 12] = [
    Template { mode: EvidenceMode::Statistics, style: TemplateStyle::Standard, grounding: STATS, tone: STANDARD },
    Template { mode: EvidenceMode::Statistics, style: TemplateStyle::Strict, grounding: STATS, tone: STRICT },
    Template { mode: EvidenceMode::Statistics, style: TemplateStyle::Light, grounding: STATS, tone: LIGHT },
    Template { mode: EvidenceMode::Statistics, style: TemplateStyle::CitationLight, grounding: STATS, tone: CITATION_LIGHT },
    Template { mode: EvidenceMode::Context, style: TemplateStyle::Standard, grounding: CONTEXT, tone: STANDARD },
    Template { mode: EvidenceMode::Context, style: TemplateStyle::Strict, grounding: CONTEXT, tone: STRICT },
    Template { mode: EvidenceMode::Context, style: TemplateStyle::Light, grounding: CONTEXT, tone: LIGHT },
    Template { mode: EvidenceMode::Context, style: TemplateStyle::CitationLight, grounding: CONTEXT, tone: CITATION_LIGHT },
    Template { mode: EvidenceMode::Hybrid, style: TemplateStyle::Standard, grounding: HYBRID, tone: STANDARD },
    Template { mode: EvidenceMode::Hybrid, style: TemplateStyle::Strict, grounding: HYBRID, tone: STRICT },
    Template { mode: EvidenceMode::Hybrid, style: TemplateStyle::Light, grounding: HYBRID, tone: LIGHT },
    Template { mode: EvidenceMode::Hybrid, style: TemplateStyle::CitationLight, grounding: HYBRID, tone: CITATION_LIGHT },
];

pub fn style_for(category: QueryCategory) -> TemplateStyle {
    match category {
        QueryCategory::SimpleLookup => TemplateStyle::Light,
        QueryCategory::Complex => TemplateStyle::Standard,
        QueryCategory::Ambiguous | QueryCategory::Noisy => TemplateStyle::Strict,
        QueryCategory::Conversational => TemplateStyle::CitationLight,
    }
}

pub fn select(mode: EvidenceMode, category: QueryCategory) -> &'static Template {
    let style = style_for(category);
    TEMPLATES
        .iter()
        .find(|t| t.mode == mode && t.style == style)
        .unwrap_or(&TEMPLATES[0])
}

impl Template {
    /// Full prompt: instructions, optional transcript, evidence blocks, question.
    pub fn render(&self, question: &str, evidence_blocks: &[String], conversation: Option<&str>) -> String {
        let mut p = String::from("You answer questions about basketball for fans.\n");
        let _ = writeln!(p, "{}\n{}\n{}\n", self.grounding, self.tone, REFUSAL_RULE);
        if let Some(conversation) = conversation {
            let _ = writeln!(p, "{conversation}\n");
        }
        for block in evidence_blocks {
            let _ = writeln!(p, "{block}\n");
        }
        let _ = write!(p, "QUESTION: {question}\nANSWER:");
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_has_a_template() {
        let cats = [
            QueryCategory::SimpleLookup,
            QueryCategory::Complex,
            QueryCategory::Ambiguous,
            QueryCategory::Noisy,
            QueryCategory::Conversational,
        ];
        for mode in [EvidenceMode::Statistics, EvidenceMode::Context, EvidenceMode::Hybrid] {
            for cat in cats {
                let t = select(mode, cat);
                assert_eq!((t.mode, t.style), (mode, style_for(cat)));
            }
        }
    }

    #[test]
    fn noisy_questions_get_strict_citations() {
        let t = select(EvidenceMode::Hybrid, QueryCategory::Noisy);
        assert_eq!(t.style, TemplateStyle::Strict);
        let p = t.render("who best rn??", &["STATISTICS: none".into()], None);
        assert!(p.contains("citation on every sentence"));
        assert!(p.ends_with("QUESTION: who best rn??\nANSWER:"));
    }
}
