//! Snap capture command.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use console::style;

use ms_core::config::ConfigHandle;
use ms_core::error::MsResult;
use ms_models::Location;
use ms_services::{SaveOutcome, SnapDraft};
use crate::OutputFormat;

/// Run the add command.
pub async fn run(
    config: ConfigHandle,
    title: Option<String>,
    note: String,
    photo: Option<PathBuf>,
    coordinates: Option<(f64, f64)>,
    format: OutputFormat,
) -> MsResult<()> {
    let registry = super::open_registry(&config).await?;

    let title = match title {
        Some(title) => title,
        None => registry.snaps.default_title().await,
    };
    let photo = match photo {
        Some(path) => photo_data_url(&path)?,
        None => String::new(),
    };
    let location = match coordinates {
        Some((latitude, longitude)) => Location::Known { latitude, longitude },
        None => Location::Unknown,
    };

    let outcome = registry
        .snaps
        .save_snap(SnapDraft { title, note, photo, location })
        .await?;

    match format {
        OutputFormat::Json => {
            let value = match outcome {
                SaveOutcome::Saved { id } => serde_json::json!({"status": "saved", "id": id}),
                SaveOutcome::Skipped => serde_json::json!({"status": "skipped"}),
                SaveOutcome::Busy => serde_json::json!({"status": "busy"}),
            };
            println!("{value}");
        }
        OutputFormat::Text => match outcome {
            SaveOutcome::Saved { id } => {
                println!("  {} Saved snap {}.", style("OK").green().bold(), id);
            }
            SaveOutcome::Skipped => {
                println!("  Nothing entered, snap not saved.");
            }
            SaveOutcome::Busy => {
                println!(
                    "  {} A save is already in progress.",
                    style("BUSY").yellow().bold()
                );
            }
        },
    }

    Ok(())
}

/// Read an image file into a base64 `data:` URL.
fn photo_data_url(path: &Path) -> MsResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for(path),
        STANDARD.encode(bytes)
    ))
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
