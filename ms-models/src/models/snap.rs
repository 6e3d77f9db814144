//! Snap entity model.
//!
//! A snap is one captured record: title, free-text note, an optional photo
//! held as a `data:` URL, the capture time, and a geolocation that is either
//! a coordinate pair or unknown. Snaps are keyed by an auto-incrementing id.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use ms_core::constants::UNKNOWN_COORDINATE;

use crate::store::Record;

/// Where a snap was captured.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Location {
    Known { latitude: f64, longitude: f64 },
    #[default]
    Unknown,
}

impl Location {
    /// Build from nullable columns. Anything short of a full pair is unknown.
    pub fn from_columns(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Location::Known { latitude, longitude },
            _ => Location::Unknown,
        }
    }

    pub fn columns(&self) -> (Option<f64>, Option<f64>) {
        match *self {
            Location::Known { latitude, longitude } => (Some(latitude), Some(longitude)),
            Location::Unknown => (None, None),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Location::Known { .. })
    }

    /// Map link for a known location.
    pub fn maps_url(&self) -> Option<String> {
        match *self {
            Location::Known { latitude, longitude } => Some(format!(
                "https://www.google.com/maps/search/?api=1&query={latitude},{longitude}"
            )),
            Location::Unknown => None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Known { latitude, longitude } => write!(f, "{latitude}, {longitude}"),
            Location::Unknown => f.write_str(UNKNOWN_COORDINATE),
        }
    }
}

/// A stored snap.
#[derive(Debug, Clone, PartialEq)]
pub struct Snap {
    pub id: Option<i64>,
    pub title: String,
    pub note: String,
    /// Photo as a `data:` URL, or empty when none was attached.
    pub photo: String,
    pub captured_at: DateTime<Utc>,
    pub location: Location,
}

impl Snap {
    pub fn new(
        title: impl Into<String>,
        note: impl Into<String>,
        photo: impl Into<String>,
        location: Location,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            note: note.into(),
            photo: photo.into(),
            captured_at,
            location,
        }
    }

    pub fn has_photo(&self) -> bool {
        !self.photo.is_empty()
    }

    /// Wire form posted to the sync endpoint.
    pub fn to_payload(&self) -> SnapPayload {
        let (latitude, longitude) = match self.location {
            Location::Known { latitude, longitude } => {
                (Coordinate::Degrees(latitude), Coordinate::Degrees(longitude))
            }
            Location::Unknown => (Coordinate::unknown(), Coordinate::unknown()),
        };

        SnapPayload {
            title: self.title.clone(),
            note: self.note.clone(),
            photo: self.photo.clone(),
            captured_at: self.captured_at,
            latitude,
            longitude,
        }
    }
}

impl Record for Snap {
    type Key = i64;

    const TABLE: &'static str = "snaps";
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            title: row.get("title")?,
            note: row.get("note")?,
            photo: row.get("photo")?,
            captured_at: row.get("captured_at")?,
            location: Location::from_columns(row.get("latitude")?, row.get("longitude")?),
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let (latitude, longitude) = self.location.columns();
        conn.execute(
            "INSERT INTO snaps (title, note, photo, captured_at, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![self.title, self.note, self.photo, self.captured_at, latitude, longitude],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let Some(id) = self.id else {
            return self.insert(conn);
        };
        let (latitude, longitude) = self.location.columns();
        conn.execute(
            "INSERT INTO snaps (id, title, note, photo, captured_at, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                note = excluded.note,
                photo = excluded.photo,
                captured_at = excluded.captured_at,
                latitude = excluded.latitude,
                longitude = excluded.longitude",
            params![id, self.title, self.note, self.photo, self.captured_at, latitude, longitude],
        )?;
        Ok(id)
    }

    fn update(&self, conn: &Connection, key: &i64) -> rusqlite::Result<usize> {
        let (latitude, longitude) = self.location.columns();
        conn.execute(
            "UPDATE snaps SET title = ?1, note = ?2, photo = ?3, captured_at = ?4,
                latitude = ?5, longitude = ?6
             WHERE id = ?7",
            params![self.title, self.note, self.photo, self.captured_at, latitude, longitude, key],
        )
    }
}

/// One coordinate on the wire: degrees, or the literal `"Unknown"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Degrees(f64),
    Sentinel(String),
}

impl Coordinate {
    pub fn unknown() -> Self {
        Coordinate::Sentinel(UNKNOWN_COORDINATE.to_string())
    }
}

/// Snap as posted to the sync endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapPayload {
    pub title: String,
    pub note: String,
    #[serde(rename = "photoasdataurl")]
    pub photo: String,
    #[serde(rename = "datetime")]
    pub captured_at: DateTime<Utc>,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
}
