use anyhow::{anyhow, bail, Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use courtside_core::traits::RelationalStore;
use courtside_core::types::{CellValue, Row};

/// Stats database opened read-only. SQLite itself refuses writes on this
/// connection, and statements it reports as non-read-only are never stepped.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    fetch_limit: usize,
}

impl SqliteStore {
    pub fn open(path: &Path, fetch_limit: usize) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_context(|| format!("opening stats db {}", path.display()))?;
        info!(path = %path.display(), "stats db opened read-only");
        Ok(Self { conn: Mutex::new(conn), fetch_limit: fetch_limit.max(1) })
    }
}

fn cell(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(n) => CellValue::Integer(n),
        ValueRef::Real(x) => CellValue::Real(x),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(b) => CellValue::Text(format!("<blob {} bytes>", b.len())),
    }
}

impl RelationalStore for SqliteStore {
    fn execute(&self, read_only_query: &str) -> Result<Vec<Row>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("stats db lock poisoned: {e}"))?;
        let mut stmt = conn.prepare(read_only_query).context("prepare failed")?;
        if !stmt.readonly() {
            bail!("statement is not read-only");
        }
        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                cells.push((name.clone(), cell(row.get_ref(i)?)));
            }
            out.push(Row::new(cells));
            if out.len() >= self.fetch_limit {
                break;
            }
        }
        Ok(out)
    }
}
