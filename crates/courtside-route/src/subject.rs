//! Follow-up questions ("what about his assists?") name no subject of their
//! own. Rather than running coreference, the SQL generator is handed the
//! most recent named subject from the conversation.

use regex::Regex;
use std::sync::LazyLock;

use courtside_core::types::ConversationTurn;

use crate::patterns::PatternTable;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:he|him|his|she|her|they|them|their|that player|that team|this player|this team|what about|how about|same for)\b")
        .expect("reference regex is valid")
});

/// True when the query leans on an earlier turn for its subject.
pub fn needs_subject(query: &str, table: &PatternTable) -> bool {
    REFERENCE.is_match(query) && table.first_entity(query).is_none()
}

/// Most recent named entity in the conversation, newest turn first; within
/// a turn the question wins over the answer.
pub fn last_subject(turns: &[ConversationTurn], table: &PatternTable) -> Option<String> {
    turns
        .iter()
        .rev()
        .find_map(|t| table.first_entity(&t.query).or_else(|| table.first_entity(&t.answer)))
        .map(str::to_string)
}
