//! Dictionary expansion of the embedding input.
//!
//! The dictionary is a list of disjoint equivalence groups (nickname and
//! canonical name, abbreviation and full term, domain synonyms). When any
//! member of a group appears in the query, the other members become
//! candidates. Expansions only feed the embedder; the user never sees them
//! and the SQL generator never receives them.
//!
//! Re-expanding `embedding_text()` adds nothing. The reasons:
//! - A group is charged its full size whether or not some members are
//!   already present, and it is taken whole or not at all.
//! - Selection walks groups in order of first appearance and stops at the
//!   first one that does not fit.
//! - The budget shrinks as the text grows.
//! - Expansions sit in their own `;` segments, so they cannot join the
//!   original words into a new phrase.

use std::sync::LazyLock;

/// Upper bound on added terms, however short the query.
pub const MAX_EXPANSION_TERMS: usize = 6;
/// Budget is `LENGTH_SCALE / word_count`, so long queries get fewer terms.
pub const LENGTH_SCALE: usize = 24;

const SEGMENT_BREAKS: &[char] = &[';', ',', '.', '?', '!', ':', '(', ')'];

const GROUPS: &[&[&str]] = &[
    &["lebron james", "king james", "lbj"],
    &["stephen curry", "steph", "chef curry"],
    &["kevin durant", "kd", "slim reaper"],
    &["giannis antetokounmpo", "greek freak"],
    &["nikola jokic", "joker"],
    &["shai gilgeous-alexander", "sga"],
    &["anthony davis", "the brow"],
    &["luka doncic", "luka magic"],
    &["joel embiid", "the process"],
    &["kawhi leonard", "the claw"],
    &["victor wembanyama", "wemby"],
    &["james harden", "the beard"],
    &["ppg", "points per game"],
    &["rpg", "rebounds per game"],
    &["apg", "assists per game"],
    &["fg%", "field goal percentage"],
    &["3pt", "three-point"],
    &["ts%", "true shooting percentage"],
    &["mvp", "most valuable player"],
    &["dpoy", "defensive player of the year"],
    &["roy", "rookie of the year"],
    &["6moy", "sixth man of the year"],
    &["goat", "greatest of all time"],
    &["underrated", "overlooked", "slept on"],
    &["overrated", "overhyped"],
    &["clutch", "late-game"],
    &["defense", "defending", "perimeter defense"],
    &["playoffs", "postseason"],
    &["scorer", "bucket-getter"],
    &["fans", "fanbase", "supporters"],
    &["injury", "injured"],
];

static DEFAULT_EXPANDER: LazyLock<QueryExpander> = LazyLock::new(QueryExpander::default);

/// The query as typed plus the terms added for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub original: String,
    pub expansions: Vec<String>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool { self.expansions.is_empty() }

    /// Text handed to the embedder.
    pub fn embedding_text(&self) -> String {
        if self.expansions.is_empty() {
            return self.original.clone();
        }
        format!("{}; {}", self.original.trim_end(), self.expansions.join("; "))
    }
}

#[derive(Debug, Clone)]
pub struct QueryExpander {
    groups: Vec<Vec<Vec<String>>>,
    raw: Vec<Vec<String>>,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new(GROUPS.iter().map(|g| g.iter().map(|t| (*t).to_string()).collect()).collect())
    }
}

impl QueryExpander {
    /// `groups` are lists of interchangeable terms; they should not share
    /// sub-phrases with each other.
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        let tokenized = groups.iter().map(|g| g.iter().map(|t| tokenize(t)).collect()).collect();
        Self { groups: tokenized, raw: groups }
    }

    pub fn groups(&self) -> &[Vec<String>] { &self.raw }

    pub fn expand(&self, query: &str) -> Expansion {
        let segments = segments(query);
        let word_count: usize = segments.iter().map(Vec::len).sum();
        let mut remaining = (LENGTH_SCALE / word_count.max(1)).min(MAX_EXPANSION_TERMS);

        // (first trigger offset, group index)
        let mut triggered: Vec<(usize, usize)> = self
            .groups
            .iter()
            .enumerate()
            .filter_map(|(gi, members)| members.iter().filter_map(|m| first_offset(&segments, m)).min().map(|off| (off, gi)))
            .collect();
        triggered.sort_unstable();

        let mut expansions = Vec::new();
        for (_, gi) in triggered {
            let cost = self.raw[gi].len().saturating_sub(1);
            if cost > remaining {
                break;
            }
            remaining -= cost;
            for (member, tokens) in self.raw[gi].iter().zip(&self.groups[gi]) {
                if first_offset(&segments, tokens).is_none() {
                    expansions.push(member.clone());
                }
            }
        }
        Expansion { original: query.to_string(), expansions }
    }
}

/// Expands with the built-in dictionary.
pub fn expand(query: &str) -> Expansion { DEFAULT_EXPANDER.expand(query) }

fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| !(c.is_alphanumeric() || c == '%' || c == '-' || c == '\''));
    let lower = trimmed.to_lowercase();
    let lower = lower.strip_suffix("'s").map(str::to_string).unwrap_or(lower);
    let lower = lower.trim_matches('\'').to_string();
    if lower.is_empty() { None } else { Some(lower) }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().filter_map(normalize_token).collect()
}

fn segments(text: &str) -> Vec<Vec<String>> {
    text.split(SEGMENT_BREAKS).map(tokenize).filter(|s| !s.is_empty()).collect()
}

/// Global token offset of the first occurrence of `phrase` inside a single segment.
fn first_offset(segments: &[Vec<String>], phrase: &[String]) -> Option<usize> {
    if phrase.is_empty() {
        return None;
    }
    let mut base = 0;
    for seg in segments {
        if seg.len() >= phrase.len() {
            if let Some(pos) = seg.windows(phrase.len()).position(|w| w == phrase) {
                return Some(base + pos);
            }
        }
        base += seg.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_drop_possessives_and_punctuation() {
        assert_eq!(tokenize("LeBron's FG% (career)"), vec!["lebron", "fg%", "career"]);
        assert_eq!(tokenize("Gilgeous-Alexander's"), vec!["gilgeous-alexander"]);
    }

    #[test]
    fn phrases_do_not_cross_segments() {
        let segs = segments("who is the king; james harden");
        assert_eq!(first_offset(&segs, &tokenize("king james")), None);
        assert_eq!(first_offset(&segs, &tokenize("james harden")), Some(4));
    }
}
