//! Static description of the relational store, supplied as configuration.
//!
//! The generator renders this into its prompt; nothing here is read from
//! the database at runtime.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    /// Semantic hint for the generator, e.g. "season total, divide by games_played for per-game".
    #[serde(default)]
    pub hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaSpec {
    pub tables: Vec<TableSpec>,
}

impl Default for SchemaSpec {
    fn default() -> Self { Self::season_stats() }
}

fn col(name: &str, sql_type: &str, hint: &str) -> ColumnSpec {
    ColumnSpec { name: name.to_string(), sql_type: sql_type.to_string(), hint: hint.to_string() }
}

impl SchemaSpec {
    /// Regular-season player and team totals.
    pub fn season_stats() -> Self {
        let players = TableSpec {
            name: "player_stats".to_string(),
            description: "One row per player per season; all counting stats are season totals.".to_string(),
            columns: vec![
                col("player_name", "TEXT", "full name, e.g. 'Nikola Jokic'"),
                col("team", "TEXT", "three-letter abbreviation, e.g. 'DEN'"),
                col("season", "TEXT", "e.g. '2023-24'; the current season is the latest value"),
                col("games_played", "INTEGER", "games appeared in"),
                col("minutes", "REAL", "total minutes"),
                col("points", "INTEGER", "total points; per-game average is points / games_played"),
                col("rebounds", "INTEGER", "total rebounds"),
                col("assists", "INTEGER", "total assists"),
                col("steals", "INTEGER", "total steals"),
                col("blocks", "INTEGER", "total blocks"),
                col("turnovers", "INTEGER", "total turnovers"),
                col("fgm", "INTEGER", "field goals made"),
                col("fga", "INTEGER", "field goals attempted"),
                col("fg3m", "INTEGER", "three-pointers made"),
                col("fg3a", "INTEGER", "three-pointers attempted"),
                col("ftm", "INTEGER", "free throws made"),
                col("fta", "INTEGER", "free throws attempted"),
                col("plus_minus", "INTEGER", "net point differential while on court"),
            ],
        };
        let teams = TableSpec {
            name: "team_stats".to_string(),
            description: "One row per team per season.".to_string(),
            columns: vec![
                col("team", "TEXT", "three-letter abbreviation"),
                col("team_name", "TEXT", "e.g. 'Los Angeles Lakers'"),
                col("season", "TEXT", "e.g. '2023-24'"),
                col("games_played", "INTEGER", "games played"),
                col("wins", "INTEGER", "wins"),
                col("losses", "INTEGER", "losses"),
                col("points", "INTEGER", "total points scored"),
                col("points_allowed", "INTEGER", "total points allowed"),
            ],
        };
        Self { tables: vec![players, teams] }
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}
