//! CLI command implementations.

pub mod add;
pub mod list;
pub mod edit;
pub mod delete;
pub mod post;
pub mod config;
pub mod log;
pub mod db;

use ms_core::config::ConfigHandle;
use ms_core::error::MsResult;
use ms_models::Database;
use ms_services::ServiceRegistry;

/// Helper to initialize the database from config.
pub async fn init_database(config: &ConfigHandle) -> MsResult<Database> {
    let cfg = config.read().await;
    let db_path = cfg.effective_db_path()?;
    Database::init(&db_path, &cfg.database)
}

/// Helper to open the database and start every service.
pub async fn open_registry(config: &ConfigHandle) -> MsResult<ServiceRegistry> {
    let db = init_database(config).await?;
    let registry = ServiceRegistry::open(db, config.clone()).await?;
    registry.init_all()?;
    Ok(registry)
}

/// Print a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> MsResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Truncate a string to a maximum number of characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 8), "a lon...");
        assert_eq!(truncate("überprüfung", 6), "übe...");
        assert_eq!(truncate("abcdef", 2), "ab");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
