use std::fmt::Write as _;

use courtside_core::types::{ConversationTurn, Query};

/// Labeled transcript of the last `n` turns, or `None` on a conversation's
/// first turn or when there is nothing to show.
pub fn render_conversation(query: &Query, turns: &[ConversationTurn], n: usize) -> Option<String> {
    if query.is_first_turn() || turns.is_empty() || n == 0 {
        return None;
    }
    let recent = &turns[turns.len().saturating_sub(n)..];
    let mut out = String::from("CONVERSATION SO FAR:\n");
    for t in recent {
        let _ = writeln!(out, "User: {}", t.query.trim());
        let _ = writeln!(out, "Assistant: {}", t.answer.trim());
    }
    Some(out.trim_end().to_string())
}
