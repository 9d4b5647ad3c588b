//! Read-only statement guard.
//!
//! The scan runs over the raw generated text, including string literals and
//! comments, so no prompt content can smuggle a write past it. Anything
//! that looks like a write is rejected even if it is harmless in context.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static WRITE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|delete|drop|alter|create|replace|truncate|attach|detach|pragma|vacuum|reindex|grant|revoke|merge|upsert|begin|commit|rollback|savepoint|release|analyze)\b",
    )
    .expect("write token regex is valid")
});

static READ_LEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:select|with)\b").expect("read lead regex is valid"));

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardError {
    /// The text contains a write, DDL or transaction keyword.
    #[error("statement contains forbidden keyword '{token}'")]
    Write { token: String },

    /// Not a single SELECT/WITH statement; a generation defect, not an attack.
    #[error("{0}")]
    Syntax(String),
}

/// Fails on the first write, DDL or transaction keyword anywhere in `text`.
pub fn scan_writes(text: &str) -> Result<(), GuardError> {
    match WRITE_TOKEN.find(text) {
        Some(m) => Err(GuardError::Write { token: m.as_str().to_ascii_uppercase() }),
        None => Ok(()),
    }
}

/// Returns the statement without its trailing semicolon if it is a single
/// read-only query.
pub fn check_read_only(statement: &str) -> Result<&str, GuardError> {
    scan_writes(statement)?;
    let body = statement.trim().trim_end_matches(';').trim_end();
    if body.is_empty() {
        return Err(GuardError::Syntax("empty statement".to_string()));
    }
    if has_separator_outside_quotes(body) {
        return Err(GuardError::Syntax("more than one statement".to_string()));
    }
    if !READ_LEAD.is_match(body) {
        return Err(GuardError::Syntax("statement does not start with SELECT or WITH".to_string()));
    }
    Ok(body)
}

/// `;` inside a quoted literal or identifier does not end a statement.
/// Doubled quotes (`'it''s'`) toggle twice and stay balanced.
fn has_separator_outside_quotes(body: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in body.chars() {
        match (quote, c) {
            (None, '\'' | '"' | '`') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ';') => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_passes() {
        assert_eq!(check_read_only("SELECT 1;  "), Ok("SELECT 1"));
        assert!(check_read_only("with t as (select 1) select * from t").is_ok());
    }

    #[test]
    fn identifiers_containing_keywords_pass() {
        assert!(check_read_only("SELECT last_update, created_by FROM player_stats").is_ok());
    }

    #[test]
    fn writes_are_flagged_anywhere() {
        assert_eq!(
            check_read_only("SELECT 1; dRoP TABLE player_stats"),
            Err(GuardError::Write { token: "DROP".into() })
        );
        assert!(matches!(check_read_only("SELECT '-- delete me'"), Err(GuardError::Write { .. })));
        assert!(matches!(check_read_only("PRAGMA writable_schema = 1"), Err(GuardError::Write { .. })));
    }

    #[test]
    fn prose_and_stacked_reads_are_syntax_errors() {
        assert!(matches!(check_read_only("I cannot answer that"), Err(GuardError::Syntax(_))));
        assert!(matches!(check_read_only("SELECT 1; SELECT 2"), Err(GuardError::Syntax(_))));
        assert!(matches!(check_read_only("   ;"), Err(GuardError::Syntax(_))));
    }

    #[test]
    fn semicolon_inside_literal_is_one_statement() {
        assert_eq!(
            check_read_only("SELECT * FROM player_stats WHERE player_name = 'A;B';"),
            Ok("SELECT * FROM player_stats WHERE player_name = 'A;B'")
        );
        assert!(check_read_only("SELECT \"a;b\" FROM t").is_ok());
        assert!(check_read_only("SELECT 'it''s;' FROM t").is_ok());
        assert!(matches!(check_read_only("SELECT 'x'; SELECT 2"), Err(GuardError::Syntax(_))));
    }

    #[test]
    fn scan_covers_text_outside_the_statement() {
        assert!(scan_writes("```sql\nSELECT 1\n```\nthen DROP it").is_err());
        assert_eq!(scan_writes("```sql\nSELECT 1\n```"), Ok(()));
    }
}
