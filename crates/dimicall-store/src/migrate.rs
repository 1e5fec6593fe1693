use crate::error::{Result, StoreError};
use rusqlite::{Connection, OptionalExtension};

const MIGRATIONS: &[(&str, &str)] = &[("001_init.sql", include_str!("../migrations/001_init.sql"))];

pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    ensure_schema_table(&tx)?;
    let current = schema_version(&tx)?;

    if current > latest_version() {
        return Err(StoreError::Migration(format!(
            "db version {} newer than available migrations {}",
            current,
            latest_version()
        )));
    }

    for (version, (name, sql)) in (1..).zip(MIGRATIONS.iter()) {
        if current >= version {
            continue;
        }
        tx.execute_batch(sql)?;
        set_version(&tx, version)?;
        tracing::info!(migration = name, version, "applied migration");
    }

    tx.commit()?;
    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'dimicall_schema';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Ok(0);
    }
    let version: Option<i64> = conn
        .query_row("SELECT version FROM dimicall_schema LIMIT 1;", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0))
}

fn ensure_schema_table(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS dimicall_schema (version INTEGER NOT NULL);")?;
    let existing: Option<i64> = conn
        .query_row("SELECT version FROM dimicall_schema LIMIT 1;", [], |row| {
            row.get(0)
        })
        .optional()?;
    if existing.is_none() {
        conn.execute("INSERT INTO dimicall_schema (version) VALUES (0);", [])?;
    }
    Ok(())
}

fn set_version(conn: &Connection, version: i64) -> Result<()> {
    let updated = conn.execute("UPDATE dimicall_schema SET version = ?1;", [version])?;
    if updated != 1 {
        return Err(StoreError::Migration(format!(
            "expected single schema row, updated {}",
            updated
        )));
    }
    Ok(())
}
