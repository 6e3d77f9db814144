//! Database management commands.

use clap::Subcommand;
use comfy_table::{Table, presets::UTF8_FULL, modifiers::UTF8_ROUND_CORNERS, ContentArrangement};
use console::style;
use dialoguer::Confirm;

use ms_core::config::ConfigHandle;
use ms_core::error::MsResult;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum DbAction {
    /// Show database statistics.
    Stats,
    /// Run an integrity check.
    Check,
    /// Reset the database (WARNING: destroys all snaps, settings and log entries).
    Reset,
    /// Show the database file path.
    Path,
}

pub async fn run(config: ConfigHandle, action: DbAction, format: OutputFormat) -> MsResult<()> {
    let db_path = config.read().await.effective_db_path()?;

    match action {
        DbAction::Stats => {
            let db = super::init_database(&config).await?;
            let stats = db.stats()?;
            let schema_version = db.schema_version()?;

            let file_size = std::fs::metadata(&db_path).ok().map(|m| m.len());
            let wal_size = std::fs::metadata(db_path.with_extension("db-wal"))
                .ok()
                .map(|m| m.len());

            let conn = db.conn()?;
            let journal_mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap_or_else(|_| "unknown".to_string());

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({
                        "path": db_path.display().to_string(),
                        "schema_version": schema_version,
                        "tables": {
                            "snaps": stats.snaps,
                            "config": stats.config,
                            "applog": stats.applog,
                        },
                        "file_size_bytes": file_size,
                        "wal_size_bytes": wal_size,
                        "journal_mode": journal_mode,
                    }));
                }
                OutputFormat::Text => {
                    println!("{}", style("Database Statistics").bold().underlined());
                    println!("  Path:            {}", db_path.display());
                    println!("  Schema version:  {}", schema_version);
                    println!("  Journal mode:    {}", journal_mode);
                    println!();

                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .apply_modifier(UTF8_ROUND_CORNERS)
                        .set_content_arrangement(ContentArrangement::Dynamic);

                    table.set_header(vec!["Table", "Row Count"]);
                    table.add_row(vec!["snaps".to_string(), stats.snaps.to_string()]);
                    table.add_row(vec!["config".to_string(), stats.config.to_string()]);
                    table.add_row(vec!["applog".to_string(), stats.applog.to_string()]);
                    println!("{table}");

                    println!();
                    println!("{}", style("Storage").bold().underlined());
                    if let Some(size) = file_size {
                        println!("  Database:        {}", super::format_bytes(size));
                    }
                    if let Some(size) = wal_size {
                        println!("  WAL file:        {}", super::format_bytes(size));
                    }
                }
            }
        }
        DbAction::Check => {
            println!(
                "  {} Running integrity check...",
                style("...").dim()
            );
            let db = super::init_database(&config).await?;

            match db.run_integrity_check() {
                Ok(()) => {
                    println!(
                        "  {} Integrity check passed.",
                        style("OK").green().bold()
                    );
                }
                Err(e) => {
                    println!(
                        "  {} Integrity check failed: {}",
                        style("FAIL").red().bold(),
                        e
                    );
                }
            }

            let version = db.schema_version()?;
            let expected = ms_core::constants::DB_SCHEMA_VERSION;
            if version == expected {
                println!(
                    "  {} Schema at version {}.",
                    style("OK").green().bold(),
                    version
                );
            } else {
                println!(
                    "  {} Schema at version {}, expected {}.",
                    style("WARN").yellow().bold(),
                    version,
                    expected
                );
            }
        }
        DbAction::Reset => {
            println!(
                "  {} This will delete ALL snaps, settings and log entries.",
                style("WARNING").red().bold()
            );
            println!("  Database: {}", db_path.display());

            let confirmed = Confirm::new()
                .with_prompt("  Are you sure you want to reset the database?")
                .default(false)
                .interact()
                .unwrap_or(false);

            if !confirmed {
                println!("  Reset cancelled.");
                return Ok(());
            }

            let db = super::init_database(&config).await?;
            db.reset()?;
            println!(
                "  {} Database reset complete.",
                style("OK").green().bold()
            );
        }
        DbAction::Path => {
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({"path": db_path.display().to_string()}));
                }
                OutputFormat::Text => {
                    println!("{}", db_path.display());
                }
            }
        }
    }

    Ok(())
}
