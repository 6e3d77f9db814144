//! Generic keyed record store over the SQLite tables.
//!
//! A `Record` maps one Rust type onto one table with a single key column.
//! `RecordStore` offers point reads and writes, a lazy `Cursor` for
//! enumeration in ascending key order, and `write` for running several
//! operations as one all-or-nothing `WriteUnit`.
//!
//! Cursors fetch in small keyset chunks (`WHERE key > last ORDER BY key`),
//! so no statement stays open between steps and a cursor can resume after
//! the last key it handed out.

use std::collections::VecDeque;
use std::fmt::Debug;

use rusqlite::types::{FromSql, ToSql};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::debug;

use ms_core::error::{MsError, MsResult};

use crate::db::{storage_err, Database};

/// Rows fetched per cursor step.
pub const CURSOR_CHUNK: usize = 64;

/// A type stored as one row of a keyed table.
pub trait Record: Sized {
    /// Primary key type.
    type Key: ToSql + FromSql + Clone + Debug;

    /// Table name.
    const TABLE: &'static str;

    /// Primary key column name.
    const KEY_COLUMN: &'static str;

    /// The key, if the record has been stored.
    fn key(&self) -> Option<Self::Key>;

    /// Build a record from a `SELECT *` row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Insert as a new row. Fails if the key already exists.
    fn insert(&self, conn: &Connection) -> rusqlite::Result<Self::Key>;

    /// Insert or replace the row with the same key.
    fn upsert(&self, conn: &Connection) -> rusqlite::Result<Self::Key>;

    /// Overwrite the row stored under `key`. Returns the number of rows changed.
    fn update(&self, conn: &Connection, key: &Self::Key) -> rusqlite::Result<usize>;
}

fn get_in<R: Record>(conn: &Connection, key: &R::Key) -> MsResult<Option<R>> {
    let sql = format!("SELECT * FROM {} WHERE {} = ?1", R::TABLE, R::KEY_COLUMN);
    conn.query_row(&sql, params![key], R::from_row)
        .optional()
        .map_err(storage_err)
}

fn delete_in<R: Record>(conn: &Connection, key: &R::Key) -> MsResult<bool> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", R::TABLE, R::KEY_COLUMN);
    let rows = conn.execute(&sql, params![key]).map_err(storage_err)?;
    Ok(rows > 0)
}

fn clear_in<R: Record>(conn: &Connection) -> MsResult<usize> {
    let sql = format!("DELETE FROM {}", R::TABLE);
    conn.execute(&sql, []).map_err(storage_err)
}

fn count_in<R: Record>(conn: &Connection) -> MsResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0)).map_err(storage_err)?;
    Ok(count.max(0) as usize)
}

/// Fetch up to `limit` rows whose key sorts after `after`.
fn fetch_after<R: Record>(
    conn: &Connection,
    after: Option<&R::Key>,
    limit: usize,
) -> MsResult<Vec<(R::Key, R)>> {
    let map = |row: &Row<'_>| -> rusqlite::Result<(R::Key, R)> {
        Ok((row.get(R::KEY_COLUMN)?, R::from_row(row)?))
    };

    let rows = match after {
        Some(key) => {
            let sql = format!(
                "SELECT * FROM {t} WHERE {k} > ?1 ORDER BY {k} ASC LIMIT {limit}",
                t = R::TABLE,
                k = R::KEY_COLUMN,
            );
            let mut stmt = conn.prepare_cached(&sql).map_err(storage_err)?;
            let rows = stmt
                .query_map(params![key], map)
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        }
        None => {
            let sql = format!(
                "SELECT * FROM {t} ORDER BY {k} ASC LIMIT {limit}",
                t = R::TABLE,
                k = R::KEY_COLUMN,
            );
            let mut stmt = conn.prepare_cached(&sql).map_err(storage_err)?;
            let rows = stmt
                .query_map([], map)
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        }
    };

    rows.map_err(storage_err)
}

/// Keyset position shared by read and write cursors.
struct KeysetState<R: Record> {
    after: Option<R::Key>,
    buffer: VecDeque<(R::Key, R)>,
    exhausted: bool,
}

impl<R: Record> KeysetState<R> {
    fn new() -> Self {
        Self {
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn next_with(
        &mut self,
        conn: impl FnOnce() -> MsResult<Vec<(R::Key, R)>>,
    ) -> Option<MsResult<(R::Key, R)>> {
        if self.buffer.is_empty() {
            if self.exhausted {
                return None;
            }
            match conn() {
                Ok(rows) => {
                    if rows.len() < CURSOR_CHUNK {
                        self.exhausted = true;
                    }
                    if let Some((key, _)) = rows.last() {
                        self.after = Some(key.clone());
                    }
                    self.buffer.extend(rows);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Lazy read cursor over a table in ascending key order.
///
/// Each chunk borrows a pooled connection only for the duration of the fetch.
pub struct Cursor<R: Record> {
    db: Database,
    state: KeysetState<R>,
}

impl<R: Record> Cursor<R> {
    fn new(db: Database) -> Self {
        Self {
            db,
            state: KeysetState::new(),
        }
    }

    /// Start again from the smallest key.
    pub fn restart(&mut self) {
        self.state = KeysetState::new();
    }
}

impl<R: Record> Iterator for Cursor<R> {
    type Item = MsResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let db = &self.db;
        let after = self.state.after.clone();
        self.state
            .next_with(|| {
                let conn = db.conn()?;
                fetch_after::<R>(&conn, after.as_ref(), CURSOR_CHUNK)
            })
            .map(|res| res.map(|(_, record)| record))
    }
}

/// An all-or-nothing group of store operations.
///
/// Created by [`RecordStore::write`]. Everything done through the unit
/// commits together when the closure returns `Ok`, and rolls back otherwise.
pub struct WriteUnit<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> WriteUnit<'conn> {
    fn conn(&self) -> &Connection {
        &self.tx
    }

    pub fn get<R: Record>(&self, key: &R::Key) -> MsResult<Option<R>> {
        get_in::<R>(self.conn(), key)
    }

    /// Insert or replace a record, returning its key.
    pub fn put<R: Record>(&self, record: &R) -> MsResult<R::Key> {
        record.upsert(self.conn()).map_err(storage_err)
    }

    /// Insert a new record, returning its assigned key.
    pub fn add<R: Record>(&self, record: &R) -> MsResult<R::Key> {
        record.insert(self.conn()).map_err(storage_err)
    }

    pub fn delete<R: Record>(&self, key: &R::Key) -> MsResult<bool> {
        delete_in::<R>(self.conn(), key)
    }

    pub fn clear<R: Record>(&self) -> MsResult<usize> {
        clear_in::<R>(self.conn())
    }

    pub fn count<R: Record>(&self) -> MsResult<usize> {
        count_in::<R>(self.conn())
    }

    /// Cursor whose entries can be updated in place within this unit.
    pub fn cursor<R: Record>(&self) -> WriteCursor<'_, R> {
        WriteCursor {
            conn: self.conn(),
            state: KeysetState::new(),
        }
    }
}

/// Cursor over a table inside a write unit.
pub struct WriteCursor<'u, R: Record> {
    conn: &'u Connection,
    state: KeysetState<R>,
}

impl<'u, R: Record> Iterator for WriteCursor<'u, R> {
    type Item = MsResult<CursorEntry<'u, R>>;

    fn next(&mut self) -> Option<Self::Item> {
        let conn = self.conn;
        let after = self.state.after.clone();
        self.state
            .next_with(|| fetch_after::<R>(conn, after.as_ref(), CURSOR_CHUNK))
            .map(|res| {
                res.map(|(key, value)| CursorEntry { conn, key, value })
            })
    }
}

/// The record at a write cursor position.
pub struct CursorEntry<'u, R: Record> {
    conn: &'u Connection,
    key: R::Key,
    value: R,
}

impl<'u, R: Record> CursorEntry<'u, R> {
    pub fn key(&self) -> &R::Key {
        &self.key
    }

    pub fn value(&self) -> &R {
        &self.value
    }

    pub fn into_value(self) -> R {
        self.value
    }

    /// Replace the stored record at this position.
    pub fn update(&self, record: &R) -> MsResult<()> {
        let changed = record.update(self.conn, &self.key).map_err(storage_err)?;
        if changed == 0 {
            return Err(MsError::NotFound(format!("{} {:?}", R::TABLE, self.key)));
        }
        Ok(())
    }

    /// Delete the stored record at this position.
    pub fn delete(&self) -> MsResult<bool> {
        delete_in::<R>(self.conn, &self.key)
    }
}

/// Keyed record store backed by the pooled database.
#[derive(Clone)]
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Point read by key.
    pub fn get<R: Record>(&self, key: &R::Key) -> MsResult<Option<R>> {
        let conn = self.db.conn()?;
        get_in::<R>(&conn, key)
    }

    /// Insert or replace a record in its own unit.
    pub fn put<R: Record>(&self, record: &R) -> MsResult<R::Key> {
        self.write(|unit| unit.put(record))
    }

    /// Insert a new record in its own unit.
    pub fn add<R: Record>(&self, record: &R) -> MsResult<R::Key> {
        self.write(|unit| unit.add(record))
    }

    /// Delete by key. Returns whether a row was removed.
    pub fn delete<R: Record>(&self, key: &R::Key) -> MsResult<bool> {
        self.write(|unit| unit.delete::<R>(key))
    }

    /// Remove every record of the type. Returns the number removed.
    pub fn clear<R: Record>(&self) -> MsResult<usize> {
        self.write(|unit| unit.clear::<R>())
    }

    pub fn count<R: Record>(&self) -> MsResult<usize> {
        let conn = self.db.conn()?;
        count_in::<R>(&conn)
    }

    /// Lazy enumeration in ascending key order.
    pub fn iterate<R: Record>(&self) -> Cursor<R> {
        Cursor::new(self.db.clone())
    }

    /// Collect every record of the type.
    pub fn load_all<R: Record>(&self) -> MsResult<Vec<R>> {
        self.iterate::<R>().collect()
    }

    /// Run `f` as one write unit.
    ///
    /// The unit commits if `f` returns `Ok`. Any error rolls back every
    /// change made through the unit and is returned to the caller.
    pub fn write<T, F>(&self, f: F) -> MsResult<T>
    where
        F: FnOnce(&WriteUnit<'_>) -> MsResult<T>,
    {
        let mut conn = self.db.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err)?;
        let unit = WriteUnit { tx };

        match f(&unit) {
            Ok(value) => {
                unit.tx.commit().map_err(storage_err)?;
                Ok(value)
            }
            Err(e) => {
                debug!("write unit rolled back: {e}");
                Err(e)
            }
        }
    }
}
