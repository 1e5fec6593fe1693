use crate::error::{Result, StoreError};
use dimicall_core::ImportRunId;
use rusqlite::{params, Connection, Row};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRun {
    pub id: ImportRunId,
    pub source: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub accepted_count: u64,
    pub rejected_count: u64,
    pub complete: bool,
}

pub struct ImportRunsRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ImportRunsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn start(&self, now_utc: i64, source: &str) -> Result<ImportRun> {
        let run = ImportRun {
            id: ImportRunId::new(),
            source: source.to_string(),
            started_at: now_utc,
            finished_at: None,
            accepted_count: 0,
            rejected_count: 0,
            complete: false,
        };
        self.conn.execute(
            "INSERT INTO import_runs (id, source, started_at) VALUES (?1, ?2, ?3);",
            params![run.id.to_string(), run.source, run.started_at],
        )?;
        Ok(run)
    }

    pub fn finish(
        &self,
        now_utc: i64,
        id: ImportRunId,
        accepted: u64,
        rejected: u64,
        complete: bool,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE import_runs
             SET finished_at = ?1, accepted_count = ?2, rejected_count = ?3, complete = ?4
             WHERE id = ?5;",
            params![
                now_utc,
                i64::try_from(accepted).unwrap_or(i64::MAX),
                i64::try_from(rejected).unwrap_or(i64::MAX),
                complete,
                id.to_string()
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn get(&self, id: ImportRunId) -> Result<Option<ImportRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, started_at, finished_at, accepted_count, rejected_count, complete
             FROM import_runs WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(run_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Most recent first.
    pub fn list(&self) -> Result<Vec<ImportRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, started_at, finished_at, accepted_count, rejected_count, complete
             FROM import_runs ORDER BY started_at DESC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut runs = Vec::new();
        while let Some(row) = rows.next()? {
            runs.push(run_from_row(row)?);
        }
        Ok(runs)
    }
}

fn run_from_row(row: &Row<'_>) -> Result<ImportRun> {
    let id_str: String = row.get(0)?;
    let id = ImportRunId::from_str(&id_str).map_err(|_| StoreError::InvalidId(id_str.clone()))?;
    let accepted: i64 = row.get(4)?;
    let rejected: i64 = row.get(5)?;
    Ok(ImportRun {
        id,
        source: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        accepted_count: u64::try_from(accepted).unwrap_or(0),
        rejected_count: u64::try_from(rejected).unwrap_or(0),
        complete: row.get(6)?,
    })
}
