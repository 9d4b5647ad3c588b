/// Phrases that mark a completion as a refusal to answer from the evidence.
const LEXICON: &[&str] = &[
    "cannot find",
    "can't find",
    "could not find",
    "couldn't find",
    "unable to find",
    "doesn't contain this information",
    "does not contain this information",
    "not available",
    "no information about",
    "don't have enough information",
    "do not have enough information",
];

#[derive(Debug, Clone)]
pub struct RefusalDetector {
    phrases: Vec<String>,
}

impl Default for RefusalDetector {
    fn default() -> Self { Self { phrases: LEXICON.iter().map(|p| normalize(p)).collect() } }
}

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}', '`'], "'")
}

impl RefusalDetector {
    /// Built-in lexicon plus configured phrases.
    pub fn with_extra(extra: &[String]) -> Self {
        let mut d = Self::default();
        d.phrases.extend(extra.iter().map(|p| normalize(p)).filter(|p| !p.trim().is_empty()));
        d
    }

    pub fn is_refusal(&self, response: &str) -> bool {
        let text = normalize(response);
        self.phrases.iter().any(|p| text.contains(p.as_str()))
    }
}
