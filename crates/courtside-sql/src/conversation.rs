use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;

use courtside_core::traits::ConversationLog;
use courtside_core::types::ConversationTurn;

/// Reads turns from a `conversation_turns` table owned by the front end:
/// `(conversation_id TEXT, turn_index INTEGER, query TEXT, answer TEXT, created_at TEXT)`.
pub struct SqliteConversationLog {
    conn: Mutex<Connection>,
}

impl SqliteConversationLog {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_context(|| format!("opening conversation db {}", path.display()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|t| t.with_timezone(&Utc))
}

impl ConversationLog for SqliteConversationLog {
    fn recent_turns(&self, conversation_id: &str, n: usize) -> Result<Vec<ConversationTurn>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().map_err(|e| anyhow!("conversation db lock poisoned: {e}"))?;
        let mut stmt = conn.prepare(
            "SELECT turn_index, query, answer, created_at FROM conversation_turns \
             WHERE conversation_id = ?1 ORDER BY turn_index DESC LIMIT ?2",
        )?;
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let mut turns = stmt
            .query_map(params![conversation_id, limit], |r| {
                let index: i64 = r.get(0)?;
                Ok(ConversationTurn {
                    turn_index: usize::try_from(index).unwrap_or(0),
                    query: r.get(1)?,
                    answer: r.get(2)?,
                    asked_at: parse_timestamp(r.get(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        turns.reverse();
        Ok(turns)
    }
}
