//! Snap edit command.
//!
//! Edits go through the same path as an on-screen edit: the window holding
//! the snap is rendered, the change is applied to the rendered item, and the
//! captured window is handed to the reconciler.

use console::style;
use tracing::debug;

use ms_core::config::ConfigHandle;
use ms_core::error::{MsError, MsResult};
use ms_services::{EditCapture, PageRange};
use crate::OutputFormat;

/// Run the edit command.
pub async fn run(
    config: ConfigHandle,
    id: i64,
    title: Option<String>,
    note: Option<String>,
    format: OutputFormat,
) -> MsResult<()> {
    if title.is_none() && note.is_none() {
        println!("  Nothing to change. Pass --title and/or --note.");
        return Ok(());
    }

    let registry = super::open_registry(&config).await?;
    let position = registry
        .snaps
        .position_of(id)?
        .ok_or_else(|| MsError::NotFound(format!("snap {id}")))?;

    let mut page = registry.snaps.render_page(PageRange::containing(position))?;
    let item = page
        .item_mut(id)
        .ok_or_else(|| MsError::NotFound(format!("snap {id}")))?;
    if let Some(title) = title {
        item.title = title;
    }
    if let Some(note) = note {
        item.note = note;
    }

    let window = page.window.range();
    let snapshot = EditCapture::capture(&page);
    let snaps = &registry.snaps;
    let handle = registry.reconciler.reconcile(snapshot, || {
        // Runs before the write-back, so this may still show the old values.
        match snaps.render_page(window) {
            Ok(rerendered) => debug!(
                "re-rendered positions {}-{} ({} snaps)",
                rerendered.window.start,
                rerendered.window.end,
                rerendered.items.len()
            ),
            Err(e) => debug!("re-render failed: {e}"),
        }
    });

    let report = handle
        .await
        .map_err(|e| MsError::Internal(format!("reconcile task failed: {e}")))?;

    match format {
        OutputFormat::Json => super::print_json(&report)?,
        OutputFormat::Text => {
            let label = if report.is_clean() {
                style("OK").green().bold()
            } else {
                style("FAIL").red().bold()
            };
            println!("  {} {}", label, report.message);

            let page = registry.snaps.render_page(window)?;
            if let Some(updated) = page.items.iter().find(|item| item.id == id) {
                println!("  Title: {}", updated.title);
                println!("  Note:  {}", updated.note);
            }
        }
    }

    Ok(())
}
