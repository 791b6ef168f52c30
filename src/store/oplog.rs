//! Append-only operation log with in-transaction trimming.

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;
use crate::model::format_timestamp;

/// Hard cap on retained oplog entries; oldest rows are trimmed first.
pub const MAX_OPLOG_ENTRIES: usize = 5000;

/// One recorded operation.
#[derive(Debug, Serialize)]
pub struct OplogEntry {
    pub id: i64,
    pub operation: String,
    pub insight_id: String,
    pub detail: String,
    pub created_at: String,
}

/// Record an operation and trim entries beyond [`MAX_OPLOG_ENTRIES`].
///
/// Runs on whatever connection (or transaction) the caller holds, so the
/// cap is enforced atomically with the write that produced the entry.
pub fn log_op(
    conn: &Connection,
    operation: &str,
    insight_id: Option<&str>,
    detail: &str,
) -> Result<()> {
    let now = format_timestamp(Utc::now());
    conn.execute(
        "INSERT INTO oplog (operation, insight_id, detail, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, insight_id.unwrap_or(""), detail, now],
    )?;
    conn.execute(
        "DELETE FROM oplog WHERE id <= (SELECT MAX(id) FROM oplog) - ?1",
        params![MAX_OPLOG_ENTRIES as i64],
    )?;
    Ok(())
}

/// The most recent N oplog entries, newest first.
pub fn get_oplog(conn: &Connection, limit: usize) -> Result<Vec<OplogEntry>> {
    let limit = if limit == 0 { 20 } else { limit };
    let mut stmt = conn.prepare(
        "SELECT id, operation, insight_id, detail, created_at \
         FROM oplog ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(OplogEntry {
                id: row.get(0)?,
                operation: row.get(1)?,
                insight_id: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                detail: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Total number of retained oplog rows.
pub fn count_oplog(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM oplog", [], |row| row.get(0))?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn log_and_read_back() {
        let conn = db::open_memory_database().unwrap();
        log_op(&conn, "remember", Some("abc"), "stored something").unwrap();
        log_op(&conn, "recall", None, "q=something hits=1").unwrap();

        let entries = get_oplog(&conn, 10).unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].operation, "recall");
        assert_eq!(entries[0].insight_id, "");
        assert_eq!(entries[1].operation, "remember");
        assert_eq!(entries[1].insight_id, "abc");
    }

    #[test]
    fn trim_enforces_cap() {
        let conn = db::open_memory_database().unwrap();
        for i in 0..(MAX_OPLOG_ENTRIES + 25) {
            log_op(&conn, "remember", None, &format!("entry {i}")).unwrap();
        }
        assert_eq!(count_oplog(&conn).unwrap(), MAX_OPLOG_ENTRIES);

        // Oldest entries were dropped, newest kept
        let entries = get_oplog(&conn, 1).unwrap();
        assert_eq!(entries[0].detail, format!("entry {}", MAX_OPLOG_ENTRIES + 24));
    }

    #[test]
    fn limit_defaults_when_zero() {
        let conn = db::open_memory_database().unwrap();
        for i in 0..30 {
            log_op(&conn, "remember", None, &format!("entry {i}")).unwrap();
        }
        let entries = get_oplog(&conn, 0).unwrap();
        assert_eq!(entries.len(), 20);
    }
}
