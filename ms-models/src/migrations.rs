//! Versioned database migrations.
//!
//! Migrations run sequentially from the stored version to the target.
//! Each step applies the DDL its schema version introduced, so opening an
//! older database creates only the tables it is missing.

use rusqlite::Connection;
use tracing::{info, warn};
use ms_core::error::{MsError, MsResult};
use ms_core::constants::DB_SCHEMA_VERSION;

use crate::schema;

/// Run all pending migrations up to the current schema version.
pub fn run_migrations(conn: &Connection) -> MsResult<()> {
    migrate_to(conn, DB_SCHEMA_VERSION)
}

/// Run pending migrations up to `target_version`.
pub fn migrate_to(conn: &Connection, target_version: i32) -> MsResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version >= target_version {
        if current_version > target_version {
            warn!(
                "database is at version {current_version}, newer than requested {target_version}"
            );
        } else {
            info!("database schema is up to date (version {current_version})");
        }
        return Ok(());
    }

    info!("running migrations from version {current_version} to {target_version}");

    for version in (current_version + 1)..=target_version {
        run_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("migrations complete, schema at version {target_version}");
    Ok(())
}

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> MsResult<i32> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .map_err(|e| MsError::Migration(e.to_string()))?;

    if count == 0 {
        // First open
        conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
            .map_err(|e| MsError::Migration(e.to_string()))?;
        return Ok(0);
    }

    conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get(0)
    })
    .map_err(|e| MsError::Migration(e.to_string()))
}

fn set_schema_version(conn: &Connection, version: i32) -> MsResult<()> {
    conn.execute("UPDATE schema_version SET version = ?1", [version])
        .map_err(|e| MsError::Migration(e.to_string()))?;
    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> MsResult<()> {
    info!("applying migration version {version}");
    schema::apply_version(conn, version)
}
