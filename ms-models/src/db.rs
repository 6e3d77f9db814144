//! Database initialization, connection pooling, and lifecycle management.
//!
//! Uses SQLite in WAL mode with r2d2 connection pooling.
//! Runs integrity checks on startup and applies versioned migrations.
//! Failing to open the database is the one fatal condition for the app:
//! every other operation depends on it.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{info, warn, error};

use ms_core::config::DatabaseConfig;
use ms_core::constants::DB_SCHEMA_VERSION;
use ms_core::error::{MsError, MsResult};

use crate::schema;
use crate::migrations;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Map a rusqlite error into the storage error category.
pub(crate) fn storage_err(e: rusqlite::Error) -> MsError {
    MsError::Storage(e.to_string())
}

/// Database wrapper providing initialization, pooling, and lifecycle management.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
}

impl Database {
    /// Initialize the database at the given path at the current schema version.
    ///
    /// This:
    /// 1. Creates the database file and parent directories if needed
    /// 2. Enables WAL mode for concurrent read/write
    /// 3. Sets up connection pooling
    /// 4. Runs integrity checks if configured
    /// 5. Applies pending migrations up to `DB_SCHEMA_VERSION`
    pub fn init(db_path: &Path, config: &DatabaseConfig) -> MsResult<Self> {
        Self::init_at_version(db_path, config, DB_SCHEMA_VERSION)
    }

    /// Initialize the database, migrating it to `target_version`.
    ///
    /// Opening at a version higher than the one stored creates the tables
    /// introduced since then and leaves existing tables untouched. Opening
    /// at the stored version again is a no-op.
    pub fn init_at_version(
        db_path: &Path,
        config: &DatabaseConfig,
        target_version: i32,
    ) -> MsResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("initializing database at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
            }))
            .build(manager)
            .map_err(|e| MsError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
        };

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }

        {
            let conn = db.conn()?;
            schema::create_version_table(&conn)?;
            migrations::migrate_to(&conn, target_version)?;
        }

        info!("database initialized successfully");
        Ok(db)
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> MsResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| MsError::Pool(e.to_string()))
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Current schema version recorded in the database.
    pub fn schema_version(&self) -> MsResult<i32> {
        let conn = self.conn()?;
        migrations::get_schema_version(&conn)
    }

    /// Run a SQLite integrity check.
    pub fn run_integrity_check(&self) -> MsResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(storage_err)?;

        if result != "ok" {
            error!("database integrity check failed: {result}");
            return Err(MsError::IntegrityCheck(result));
        }

        info!("database integrity check passed");
        Ok(())
    }

    /// Get database statistics (row counts per table).
    pub fn stats(&self) -> MsResult<DatabaseStats> {
        let conn = self.conn()?;

        let count = |table: &str| -> MsResult<i64> {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            conn.query_row(&sql, [], |row| row.get(0))
                .map_err(storage_err)
        };

        Ok(DatabaseStats {
            snaps: count(schema::SNAPS_TABLE).unwrap_or(0),
            config: count(schema::CONFIG_TABLE).unwrap_or(0),
            applog: count(schema::APPLOG_TABLE).unwrap_or(0),
        })
    }

    /// Reset the database by dropping and recreating all tables.
    pub fn reset(&self) -> MsResult<()> {
        warn!("resetting database - all snaps, settings and log entries will be lost");
        let conn = self.conn()?;
        schema::drop_tables(&conn)?;
        schema::create_version_table(&conn)?;
        migrations::migrate_to(&conn, DB_SCHEMA_VERSION)?;
        info!("database reset complete");
        Ok(())
    }
}

/// Database row count statistics.
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub snaps: i64,
    pub config: i64,
    pub applog: i64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "snaps={}, config={}, applog={}",
            self.snaps, self.config, self.applog
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;",
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let config = DatabaseConfig::default();
        let db = Database::init(&path, &config).unwrap();
        (db, dir)
    }

    #[test]
    fn test_database_init() {
        let (db, _dir) = test_db();
        let stats = db.stats().unwrap();
        assert_eq!(stats.snaps, 0);
        assert_eq!(stats.config, 0);
        assert_eq!(stats.applog, 0);
        assert_eq!(db.schema_version().unwrap(), DB_SCHEMA_VERSION);
    }

    #[test]
    fn test_integrity_check() {
        let (db, _dir) = test_db();
        assert!(db.run_integrity_check().is_ok());
    }

    #[test]
    fn test_reset_clears_rows() {
        let (db, _dir) = test_db();
        {
            let conn = db.conn().unwrap();
            conn.execute(
                "INSERT INTO config (name, value) VALUES ('mailTo', 'a@example.com')",
                [],
            )
            .unwrap();
        }
        assert_eq!(db.stats().unwrap().config, 1);
        db.reset().unwrap();
        assert_eq!(db.stats().unwrap().config, 0);
        assert_eq!(db.schema_version().unwrap(), DB_SCHEMA_VERSION);
    }
}
