//! Name/value configuration entries.
//!
//! Every user setting is one row in the `config` table, stored as text.
//! Parsing and bounds live in the resolver; this model only moves strings.

use rusqlite::{params, Connection, Row};

use crate::store::Record;

/// A persisted setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Record for ConfigEntry {
    type Key = String;

    const TABLE: &'static str = "config";
    const KEY_COLUMN: &'static str = "name";

    fn key(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            value: row.get("value")?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<String> {
        conn.execute(
            "INSERT INTO config (name, value) VALUES (?1, ?2)",
            params![self.name, self.value],
        )?;
        Ok(self.name.clone())
    }

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<String> {
        conn.execute(
            "INSERT INTO config (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![self.name, self.value],
        )?;
        Ok(self.name.clone())
    }

    fn update(&self, conn: &Connection, key: &String) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE config SET value = ?1 WHERE name = ?2",
            params![self.value, key],
        )
    }
}
