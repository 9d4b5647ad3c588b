//! Evidence blocks for the synthesis prompt. Rows are tagged `[R#]` and
//! passages `[S#]` so the model can cite them and the citations can be
//! traced back.

use std::fmt::Write as _;

use courtside_core::types::{RetrievalSet, Row, StructuredResult, StructuredStatus};

fn row_values(row: &Row) -> String {
    row.cells.iter().map(|(_, v)| v.to_string()).collect::<Vec<_>>().join(" | ")
}

/// Number of rows that make it into the prompt.
pub fn rendered_rows(result: &StructuredResult, max_rows: usize) -> usize { result.rows.len().min(max_rows) }

pub fn format_structured(result: &StructuredResult, max_rows: usize) -> String {
    match &result.status {
        StructuredStatus::Error(reason) => {
            return format!("STATISTICS: the statistics query failed ({reason}); no statistics are available.");
        }
        StructuredStatus::Empty => return "STATISTICS: the statistics query returned no rows.".to_string(),
        StructuredStatus::Ok if result.rows.is_empty() => {
            return "STATISTICS: the statistics query returned no rows.".to_string();
        }
        StructuredStatus::Ok => {}
    }

    if let [row] = result.rows.as_slice() {
        let pairs: Vec<String> = row.cells.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        return format!("STATISTICS:\n[R1] {}", pairs.join(", "));
    }

    let shown = rendered_rows(result, max_rows);
    let mut out = String::from("STATISTICS:\n");
    if let Some(first) = result.rows.first() {
        let header: Vec<&str> = first.cells.iter().map(|(k, _)| k.as_str()).collect();
        let _ = writeln!(out, "columns: {}", header.join(" | "));
    }
    for (i, row) in result.rows.iter().take(shown).enumerate() {
        let _ = writeln!(out, "[R{}] {}", i + 1, row_values(row));
    }
    let omitted = result.rows.len() - shown;
    if omitted > 0 {
        let _ = writeln!(out, "({omitted} more rows omitted)");
    }
    out.trim_end().to_string()
}

pub fn format_passages(set: &RetrievalSet) -> String {
    if set.is_empty() {
        return "DISCUSSION: no relevant discussion passages were found.".to_string();
    }
    let mut out = String::from("DISCUSSION:\n");
    for (i, p) in set.passages.iter().enumerate() {
        let _ = write!(out, "[S{}] (source: {}, similarity {:.2}", i + 1, p.source_id, p.score);
        if let Some(boost) = p.boost {
            let _ = write!(out, ", upvotes {boost:.0}");
        }
        let _ = writeln!(out, ") {}", p.text.trim());
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_core::types::{CellValue, RetrievedPassage};

    fn row(name: &str, pts: i64) -> Row {
        Row::new(vec![("player_name".into(), CellValue::Text(name.into())), ("points".into(), CellValue::Integer(pts))])
    }

    #[test]
    fn single_row_is_compact() {
        let r = StructuredResult::from_rows("q", vec![row("Luka Doncic", 2370)]);
        assert_eq!(format_structured(&r, 20), "STATISTICS:\n[R1] player_name: Luka Doncic, points: 2370");
    }

    #[test]
    fn rows_are_numbered_and_capped() {
        let rows = (0..5).map(|i| row(&format!("P{i}"), 100 - i)).collect();
        let text = format_structured(&StructuredResult::from_rows("q", rows), 3);
        assert!(text.contains("columns: player_name | points"));
        assert!(text.contains("[R1] P0 | 100"));
        assert!(text.contains("[R3] P2 | 98"));
        assert!(!text.contains("[R4]"));
        assert!(text.ends_with("(2 more rows omitted)"));
    }

    #[test]
    fn empty_and_error_are_explicit() {
        assert!(format_structured(&StructuredResult::from_rows("q", vec![]), 5).contains("no rows"));
        assert!(format_structured(&StructuredResult::error("q", "no such column: x"), 5).contains("no such column: x"));
    }

    #[test]
    fn passages_carry_source_ids() {
        let set = RetrievalSet {
            passages: vec![RetrievedPassage { text: " bench is thin ".into(), source_id: "reddit:1".into(), score: 0.8123, boost: Some(41.0) }],
            below_threshold: 0,
        };
        assert_eq!(format_passages(&set), "DISCUSSION:\n[S1] (source: reddit:1, similarity 0.81, upvotes 41) bench is thin");
        assert!(format_passages(&RetrievalSet::default()).contains("no relevant"));
    }
}
