//! MetaSnap Models - Database schema, record models, migrations, and the record store.
//!
//! This crate owns all data persistence: SQLite database initialization,
//! the three keyed tables (`snaps`, `config`, `applog`), versioned
//! migrations, and the generic `RecordStore` with its lazy cursors and
//! all-or-nothing write units.

pub mod db;
pub mod schema;
pub mod models;
pub mod migrations;
pub mod store;

// Re-export key types
pub use db::{Database, DbPool};
pub use models::snap::{Location, Snap, SnapPayload};
pub use models::config_entry::ConfigEntry;
pub use models::log_entry::{LogEntry, MessageKind, Severity};
pub use store::{Cursor, CursorEntry, Record, RecordStore, WriteCursor, WriteUnit};
