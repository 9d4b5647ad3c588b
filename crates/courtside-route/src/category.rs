use regex::Regex;
use std::sync::LazyLock;

use courtside_core::types::{QueryCategory, RoutingDecision, SignalFamily};

static CONVERSATIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:hey|hi|hello|yo|sup|thanks|thank you)\b|\b(?:lol|lmao|do you think|you think|your take|what's your|ngl)\b")
        .expect("conversational regex is valid")
});

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[?!]{2,}|\b(?:u|ur|r|ppl|pls|plz|rn|tho|wat|wut|idk|bro|bruh|fr|smh)\b")
        .expect("noise regex is valid")
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:he|him|his|she|her|they|them|their|it|that one|this one)\b").expect("reference regex is valid")
});

static VAGUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:best|greatest|good|better|worst|top)\b").expect("vague regex is valid")
});

static LOOKUP_LEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:who|what|which|how many|how much|when)\b").expect("lookup regex is valid")
});

static COMPOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:and|compare|compared|versus|vs|why|explain|while|whereas)\b").expect("compound regex is valid")
});

const SIMPLE_MAX_WORDS: usize = 12;

/// Picks the prompt-template variant for a query. Checks run from most to
/// least specific: tone first, then noise, then ambiguity, then shape.
pub fn categorize(query: &str, routing: &RoutingDecision) -> QueryCategory {
    let words = query.split_whitespace().count();
    let named = routing.has_family(SignalFamily::Entity);
    let metric = routing.has_family(SignalFamily::Metric);

    if CONVERSATIONAL.is_match(query) {
        return QueryCategory::Conversational;
    }
    // `regex` has no backreferences, so letter elongation ("sooooo") is checked by hand.
    if NOISE.is_match(query) || has_elongated_word(query) {
        return QueryCategory::Noisy;
    }
    let dangling_reference = REFERENCE.is_match(query) && !named;
    let vague_superlative = VAGUE.is_match(query) && !metric && !named;
    if words <= 2 || dangling_reference || vague_superlative {
        return QueryCategory::Ambiguous;
    }
    if words <= SIMPLE_MAX_WORDS && LOOKUP_LEAD.is_match(query) && !COMPOUND.is_match(query) {
        return QueryCategory::SimpleLookup;
    }
    QueryCategory::Complex
}

fn has_elongated_word(query: &str) -> bool {
    query.split_whitespace().any(|w| {
        let chars: Vec<char> = w.chars().filter(|c| c.is_alphabetic()).collect();
        chars.windows(4).any(|win| win.iter().all(|c| c.eq_ignore_ascii_case(&win[0])))
    })
}
