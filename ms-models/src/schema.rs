//! Database schema definitions and table creation.
//!
//! Three keyed tables live under one schema version number:
//! - `snaps`: captured records, auto-incrementing id primary key
//! - `config`: name/value settings, name primary key
//! - `applog`: application log entries, auto-incrementing id primary key
//!
//! Each schema version contributes its own DDL; `migrations` applies them in order.

use rusqlite::Connection;
use ms_core::error::{MsError, MsResult};
use tracing::info;

pub const SNAPS_TABLE: &str = "snaps";
pub const CONFIG_TABLE: &str = "config";
pub const APPLOG_TABLE: &str = "applog";

/// Create the schema version bookkeeping table if it does not exist.
pub fn create_version_table(conn: &Connection) -> MsResult<()> {
    conn.execute_batch(VERSION_SQL)
        .map_err(|e| MsError::Storage(format!("failed to create schema_version: {e}")))?;
    Ok(())
}

/// Apply the DDL introduced by one schema version.
pub fn apply_version(conn: &Connection, version: i32) -> MsResult<()> {
    let sql = match version {
        1 => SCHEMA_V1_SQL,
        2 => SCHEMA_V2_SQL,
        _ => return Err(MsError::Migration(format!("no schema for version {version}"))),
    };
    conn.execute_batch(sql)
        .map_err(|e| MsError::Migration(format!("failed to apply schema v{version}: {e}")))?;
    info!("schema v{version} applied");
    Ok(())
}

/// Whether a table exists in the database.
pub fn table_exists(conn: &Connection, table: &str) -> MsResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .map_err(|e| MsError::Storage(e.to_string()))?;
    Ok(count > 0)
}

/// Drop all tables (used for database reset).
pub fn drop_tables(conn: &Connection) -> MsResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS applog;
         DROP TABLE IF EXISTS config;
         DROP TABLE IF EXISTS snaps;
         DROP TABLE IF EXISTS schema_version;",
    )
    .map_err(|e| MsError::Storage(format!("failed to drop tables: {e}")))?;
    Ok(())
}

const VERSION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

/// Version 1: snaps and settings.
const SCHEMA_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS snaps (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT NOT NULL DEFAULT '',
    note            TEXT NOT NULL DEFAULT '',
    photo           TEXT NOT NULL DEFAULT '',
    captured_at     TEXT NOT NULL,
    latitude        REAL,
    longitude       REAL,
    CHECK ((latitude IS NULL) = (longitude IS NULL))
);

CREATE TABLE IF NOT EXISTS config (
    name            TEXT PRIMARY KEY NOT NULL,
    value           TEXT NOT NULL DEFAULT ''
);
"#;

/// Version 2: application log.
const SCHEMA_V2_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS applog (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp       TEXT NOT NULL,
    severity        TEXT NOT NULL,
    message         TEXT NOT NULL,
    message_kind    TEXT NOT NULL DEFAULT 'unstructured'
);
"#;
