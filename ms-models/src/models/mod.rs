//! Record model definitions.

pub mod snap;
pub mod config_entry;
pub mod log_entry;

use rusqlite::types::Type;

/// Wrap a column parsing failure as a rusqlite conversion error.
pub(crate) fn conversion_err(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        Box::new(ms_core::MsError::Serialization(message)),
    )
}
