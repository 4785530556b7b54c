//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! Generators and repairs hand finished tables to a sink; they never
//! execute SQL directly.

use crate::{error::SynthResult, pipeline::TableSummary};
mod tables;
use rusqlite::{params, Connection};

pub struct SynthStore {
    conn: Connection,
}

/// One stage_log row read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLogRow {
    pub run_id: String,
    pub stage: String,
    pub table_name: String,
    pub row_count: i64,
}

impl SynthStore {
    pub fn open(path: &str) -> SynthResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SynthResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SynthResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        seed: u64,
        version: &str,
        mode: &str,
        started_at: &str,
    ) -> SynthResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, mode, started_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, seed as i64, version, mode, started_at],
        )?;
        Ok(())
    }

    // ── Stage log ──────────────────────────────────────────────

    pub fn append_stage_log(&self, run_id: &str, summary: &TableSummary) -> SynthResult<()> {
        self.conn.execute(
            "INSERT INTO stage_log (run_id, stage, table_name, row_count) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, summary.stage, summary.table, summary.rows as i64],
        )?;
        Ok(())
    }

    pub fn stage_logs(&self, run_id: &str) -> SynthResult<Vec<StageLogRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, stage, table_name, row_count
             FROM stage_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(StageLogRow {
                    run_id: row.get(0)?,
                    stage: row.get(1)?,
                    table_name: row.get(2)?,
                    row_count: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_log_round_trips_in_order() {
        let store = SynthStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
            .insert_run("run-1", 42, "0.1.0", "generate", "2024-01-01 00:00:00")
            .unwrap();

        for (table, rows) in [("investor", 50), ("portfolio", 103)] {
            let summary = TableSummary {
                stage: "investor",
                table: table.to_string(),
                rows,
            };
            store.append_stage_log("run-1", &summary).unwrap();
        }

        let logs = store.stage_logs("run-1").unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].table_name, "investor");
        assert_eq!(logs[1].row_count, 103);
        assert!(store.stage_logs("run-2").unwrap().is_empty());
    }

    #[test]
    fn stage_log_requires_a_run() {
        let store = SynthStore::in_memory().unwrap();
        store.migrate().unwrap();
        let summary = TableSummary {
            stage: "investor",
            table: "investor".into(),
            rows: 1,
        };
        assert!(store.append_stage_log("missing", &summary).is_err());
    }
}
