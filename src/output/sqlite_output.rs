//! SQLite sink: one row per run, one row per record

use crate::output::stats::RunReport;
use crate::output::traits::{OutputResult, RecordSink};
use crate::state::Record;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQL schema for the results database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    outcome TEXT NOT NULL,
    records INTEGER NOT NULL,
    visited INTEGER NOT NULL,
    nodes_explored INTEGER NOT NULL,
    nodes_failed INTEGER NOT NULL,
    branch_timeouts INTEGER NOT NULL
);

-- Saved records, in ledger order per run
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    position INTEGER NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_records_run ON records(run_id);
"#;

/// Appends runs and their records to a SQLite database
pub struct SqliteSink {
    conn: Connection,
    last_run_id: Option<i64>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and initializes the schema
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        Self::with_connection(conn)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> OutputResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn,
            last_run_id: None,
        })
    }

    /// Id of the run row written last by this sink
    pub fn last_run_id(&self) -> Option<i64> {
        self.last_run_id
    }

    /// Number of records stored for `run_id`
    pub fn record_count(&self, run_id: i64) -> OutputResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl RecordSink for SqliteSink {
    fn write_run(&mut self, records: &[Record], report: &RunReport) -> OutputResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO runs (started_at, finished_at, outcome, records, visited,
                               nodes_explored, nodes_failed, branch_timeouts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                report.outcome.as_str(),
                report.records as i64,
                report.visited as i64,
                report.nodes.nodes_explored as i64,
                report.nodes.nodes_failed as i64,
                report.nodes.branch_timeouts as i64,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (run_id, position, title, url) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, record) in records.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    position as i64,
                    record.title,
                    record.address.as_str()
                ])?;
            }
        }

        tx.commit()?;
        self.last_run_id = Some(run_id);
        Ok(())
    }
}
