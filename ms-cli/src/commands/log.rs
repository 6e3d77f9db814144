//! Application log commands.

use chrono::Local;
use clap::Subcommand;
use comfy_table::{Table, presets::UTF8_FULL, modifiers::UTF8_ROUND_CORNERS, ContentArrangement};
use console::style;
use dialoguer::Confirm;

use ms_core::config::ConfigHandle;
use ms_core::error::MsResult;
use ms_models::Severity;
use ms_services::AppEvent;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum LogAction {
    /// Show stored log entries, newest last.
    Show {
        /// Number of entries to show.
        #[arg(short = 'n', long, default_value = "50")]
        count: usize,
        /// Only show entries at or above this severity (debug, info, warning, error).
        #[arg(short, long)]
        level: Option<Severity>,
    },
    /// Delete every stored log entry.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn run(config: ConfigHandle, action: LogAction, format: OutputFormat) -> MsResult<()> {
    let registry = super::open_registry(&config).await?;

    match action {
        LogAction::Show { count, level } => {
            let entries: Vec<_> = registry
                .logger
                .entries()?
                .into_iter()
                .filter(|e| level.map_or(true, |min| e.severity >= min))
                .collect();
            let skip = entries.len().saturating_sub(count);
            let shown = &entries[skip..];

            match format {
                OutputFormat::Json => super::print_json(&shown)?,
                OutputFormat::Text => {
                    if shown.is_empty() {
                        println!("  The application log is empty.");
                        return Ok(());
                    }

                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .apply_modifier(UTF8_ROUND_CORNERS)
                        .set_content_arrangement(ContentArrangement::Dynamic);
                    table.set_header(vec!["Time", "Severity", "Message"]);

                    for entry in shown {
                        table.add_row(vec![
                            entry
                                .timestamp
                                .with_timezone(&Local)
                                .format("%Y-%m-%d %H:%M:%S")
                                .to_string(),
                            colorize_severity(entry.severity),
                            entry.message.clone(),
                        ]);
                    }
                    println!("{table}");
                    if skip > 0 {
                        println!("  ({skip} older entries not shown)");
                    }
                }
            }
        }
        LogAction::Clear { yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("  Delete every application log entry?")
                    .default(false)
                    .interact()
                    .unwrap_or(false);
                if !confirmed {
                    println!("  Clear cancelled.");
                    return Ok(());
                }
            }

            let removed = registry.logger.clear()?;
            registry.event_bus.emit(AppEvent::LogCleared { removed });

            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({"removed": removed})),
                OutputFormat::Text => {
                    println!(
                        "  {} Removed {} log entries.",
                        style("OK").green().bold(),
                        removed
                    );
                }
            }
        }
    }

    Ok(())
}

fn colorize_severity(severity: Severity) -> String {
    let label = severity.as_str();
    match severity {
        Severity::Error => style(label).red().bold().to_string(),
        Severity::Warning => style(label).yellow().to_string(),
        Severity::Info => style(label).green().to_string(),
        Severity::Debug => style(label).dim().to_string(),
    }
}
