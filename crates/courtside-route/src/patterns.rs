//! Classifier vocabulary, compiled once per process.
//!
//! Each family is an ordered list of `(label, regex)` pairs. Labels are what
//! the routing trace reports; for entities they are also the display name the
//! subject tracker hands to the SQL generator.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use courtside_core::config::ClassifierSettings;
use courtside_core::types::SignalFamily;

const PLAYERS: &[&str] = &[
    "LeBron James", "LeBron", "Stephen Curry", "Steph Curry", "Curry", "Kevin Durant", "Durant",
    "Giannis Antetokounmpo", "Giannis", "Nikola Jokic", "Jokic", "Luka Doncic", "Luka", "Doncic",
    "Joel Embiid", "Embiid", "Jayson Tatum", "Tatum", "Shai Gilgeous-Alexander", "Gilgeous-Alexander",
    "Anthony Edwards", "Anthony Davis", "Kawhi Leonard", "Kawhi", "Damian Lillard", "Lillard",
    "Devin Booker", "Booker", "Donovan Mitchell", "Ja Morant", "Morant", "Jimmy Butler", "Butler",
    "Kyrie Irving", "Kyrie", "James Harden", "Harden", "Victor Wembanyama", "Wembanyama",
    "Tyrese Haliburton", "Haliburton", "Jalen Brunson", "Brunson", "Domantas Sabonis", "Sabonis",
    "Trae Young", "De'Aaron Fox", "Paolo Banchero", "Bam Adebayo", "Rudy Gobert", "Gobert",
];

const TEAMS: &[&str] = &[
    "Hawks", "Celtics", "Nets", "Hornets", "Bulls", "Cavaliers", "Cavs", "Mavericks", "Mavs",
    "Nuggets", "Pistons", "Warriors", "Rockets", "Pacers", "Clippers", "Lakers", "Grizzlies",
    "Heat", "Bucks", "Timberwolves", "Wolves", "Pelicans", "Knicks", "Thunder", "Magic", "76ers",
    "Sixers", "Suns", "Trail Blazers", "Blazers", "Kings", "Spurs", "Raptors", "Jazz", "Wizards",
];

const METRICS: &[&str] = &[
    r"points?", r"pts", r"ppg", r"rebounds?", r"rpg", r"boards", r"assists?", r"apg", r"steals?",
    r"blocks?", r"turnovers?", r"minutes", r"field goals?", r"fg%?", r"three[- ]pointers?",
    r"three[- ]point", r"3pt", r"3-pointers?", r"free throws?", r"percentage", r"shooting",
    r"plus[- ]minus", r"averag(?:e|es|ed|ing)", r"per game", r"stats?", r"statistics", r"scor(?:e|ed|es|ing|er)",
    r"record", r"wins", r"losses", r"games played", r"efficiency", r"triple[- ]doubles?",
    r"double[- ]doubles?", r"numbers",
];

const RANKING: &[&str] = &[
    r"most", r"least", r"highest", r"lowest", r"top(?: \d+)?", r"leaders?", r"led", r"lead(?:s|ing)? the league",
    r"rank(?:ed|ing|s)?", r"compare[ds]?", r"comparison", r"vs\.?", r"versus", r"more than", r"fewer than",
    r"how many", r"how much", r"career[- ]high",
];

const CONJUNCTIONS: &[&str] = &[
    r"and (?:also )?explain", r"and why", r"and how come", r"based on", r"and what do (?:fans|people|analysts)",
    r"and (?:tell me|describe) (?:why|how)",
];

const OPINION: &[&str] = &[
    r"fans?", r"think", r"opinions?", r"feel", r"believe", r"debate", r"discussions?", r"reddit",
    r"narratives?", r"underrated", r"overrated", r"style", r"playstyle", r"elite", r"clutch", r"legacy",
    r"goat", r"why", r"explain", r"reasons?", r"hype", r"best", r"worst", r"favou?rite", r"say(?:ing)? about",
    r"talk(?:ing)? about", r"deserve[sd]?", r"vibes?", r"criticism", r"praised?",
];

/// Compiles a phrase into a case-insensitive regex bounded by non-word
/// characters (or the ends of the text). `\b` is not used because some
/// terms end in punctuation such as `%`.
fn bounded(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)(?:^|[^\w])(?:{pattern})(?:[^\w]|$)"))
}

#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub label: String,
    pub regex: Regex,
}

#[derive(Debug, Clone)]
pub struct FamilyPatterns {
    pub family: SignalFamily,
    pub weight: f32,
    pub entries: Vec<PatternEntry>,
}

/// Immutable pattern families in scoring order.
#[derive(Debug, Clone)]
pub struct PatternTable {
    families: Vec<FamilyPatterns>,
}

static DEFAULT_TABLE: LazyLock<Arc<PatternTable>> =
    LazyLock::new(|| Arc::new(PatternTable::build(&ClassifierSettings::default()).expect("built-in patterns are valid")));

impl PatternTable {
    /// The shared built-in table.
    pub fn shared_default() -> Arc<PatternTable> { Arc::clone(&DEFAULT_TABLE) }

    /// Builds the built-in vocabulary plus any configured additions.
    /// Configured terms are matched literally.
    pub fn build(extra: &ClassifierSettings) -> Result<Self, regex::Error> {
        let literal = |terms: &[String]| terms.iter().map(|t| (t.clone(), regex::escape(t))).collect::<Vec<_>>();
        let names = |terms: &[&str]| terms.iter().map(|t| ((*t).to_string(), regex::escape(t))).collect::<Vec<_>>();
        let patterns = |terms: &[&str]| terms.iter().map(|t| ((*t).to_string(), (*t).to_string())).collect::<Vec<_>>();

        let mut entities = names(PLAYERS);
        entities.extend(names(TEAMS));
        entities.extend(literal(&extra.extra_entities));
        let mut metrics = patterns(METRICS);
        metrics.extend(literal(&extra.extra_metrics));
        let mut opinion = patterns(OPINION);
        opinion.extend(literal(&extra.extra_opinion_terms));

        let spec = vec![
            (SignalFamily::Entity, 0.5, entities),
            (SignalFamily::Metric, 1.0, metrics),
            (SignalFamily::Ranking, 0.5, patterns(RANKING)),
            (SignalFamily::Conjunction, 1.0, patterns(CONJUNCTIONS)),
            (SignalFamily::Opinion, 1.0, opinion),
        ];
        let mut families = Vec::with_capacity(spec.len());
        for (family, weight, terms) in spec {
            let mut entries = Vec::with_capacity(terms.len());
            for (label, pattern) in terms {
                entries.push(PatternEntry { label, regex: bounded(&pattern)? });
            }
            families.push(FamilyPatterns { family, weight, entries });
        }
        Ok(Self { families })
    }

    pub fn families(&self) -> &[FamilyPatterns] { &self.families }

    pub fn family(&self, family: SignalFamily) -> Option<&FamilyPatterns> {
        self.families.iter().find(|f| f.family == family)
    }

    /// Earliest named entity in `text`, by match position.
    pub fn first_entity(&self, text: &str) -> Option<&str> {
        self.family(SignalFamily::Entity)?
            .entries
            .iter()
            .filter_map(|e| e.regex.find(text).map(|m| (m.start(), std::cmp::Reverse(e.label.len()), e.label.as_str())))
            .min()
            .map(|(_, _, label)| label)
    }
}
