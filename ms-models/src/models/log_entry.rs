//! Application log entries persisted in the `applog` table.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use ms_core::error::MsError;

use super::conversion_err;
use crate::store::Record;

/// Log severity, ordered by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
    ];

    /// Numeric rank, 0 (DEBUG) through 3 (ERROR).
    pub fn rank(self) -> u8 {
        match self {
            Severity::Debug => 0,
            Severity::Info => 1,
            Severity::Warning => 2,
            Severity::Error => 3,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(rank as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = MsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            other => Err(MsError::Serialization(format!("unknown severity: {other}"))),
        }
    }
}

/// How the message text is structured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Unstructured,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Unstructured => "unstructured",
        }
    }
}

impl FromStr for MessageKind {
    type Err = MsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unstructured" => Ok(MessageKind::Unstructured),
            other => Err(MsError::Serialization(format!("unknown message kind: {other}"))),
        }
    }
}

/// A persisted log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub message_kind: MessageKind,
}

impl LogEntry {
    /// New unstructured entry stamped with the current time.
    pub fn now(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            message_kind: MessageKind::Unstructured,
        }
    }
}

impl Record for LogEntry {
    type Key = i64;

    const TABLE: &'static str = "applog";
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let severity: String = row.get("severity")?;
        let kind: String = row.get("message_kind")?;
        Ok(Self {
            id: Some(row.get("id")?),
            timestamp: row.get("timestamp")?,
            severity: severity.parse().map_err(|e: MsError| conversion_err(2, e.to_string()))?,
            message: row.get("message")?,
            message_kind: kind.parse().map_err(|e: MsError| conversion_err(4, e.to_string()))?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO applog (timestamp, severity, message, message_kind)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                self.timestamp,
                self.severity.as_str(),
                self.message,
                self.message_kind.as_str()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let Some(id) = self.id else {
            return self.insert(conn);
        };
        conn.execute(
            "INSERT OR REPLACE INTO applog (id, timestamp, severity, message, message_kind)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                self.timestamp,
                self.severity.as_str(),
                self.message,
                self.message_kind.as_str()
            ],
        )?;
        Ok(id)
    }

    fn update(&self, conn: &Connection, key: &i64) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE applog SET timestamp = ?1, severity = ?2, message = ?3, message_kind = ?4
             WHERE id = ?5",
            params![
                self.timestamp,
                self.severity.as_str(),
                self.message,
                self.message_kind.as_str(),
                key
            ],
        )
    }
}
