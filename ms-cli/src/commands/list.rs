//! Snap listing command.

use chrono::Local;
use comfy_table::{Table, presets::UTF8_FULL, modifiers::UTF8_ROUND_CORNERS, ContentArrangement};
use console::style;

use ms_core::config::ConfigHandle;
use ms_core::error::MsResult;
use ms_services::{PageRange, SnapPage};
use crate::OutputFormat;

/// Run the list command.
pub async fn run(config: ConfigHandle, start: usize, format: OutputFormat) -> MsResult<()> {
    let registry = super::open_registry(&config).await?;
    let page = registry.snaps.render_page(PageRange::starting_at(start))?;

    match format {
        OutputFormat::Json => super::print_json(&page)?,
        OutputFormat::Text => {
            if page.total == 0 {
                println!("  No snaps yet. Capture one with `metasnap add`.");
                return Ok(());
            }
            if page.items.is_empty() {
                println!(
                    "  Nothing at position {} (there are {} snaps).",
                    page.window.start, page.total
                );
            } else {
                println!("{}", snap_table(&page));
            }
            print_navigation(&page);
        }
    }

    Ok(())
}

/// Render a page of snaps as a table.
fn snap_table(page: &SnapPage) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec!["#", "ID", "Captured", "Title", "Note", "Photo", "Location"]);
    for item in &page.items {
        let location = match (item.latitude, item.longitude) {
            (Some(lat), Some(lon)) => format!("{lat:.5}, {lon:.5}"),
            _ => "unknown".to_string(),
        };
        table.add_row(vec![
            item.position.to_string(),
            item.id.to_string(),
            item.captured_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            super::truncate(&item.title, 40),
            super::truncate(&item.note, 50),
            if item.has_photo { "yes" } else { "" }.to_string(),
            location,
        ]);
    }
    table
}

fn print_navigation(page: &SnapPage) {
    let shown_end = page.window.end.min(page.total);
    println!(
        "  Showing {}-{} of {}",
        page.window.start.min(shown_end),
        shown_end,
        page.total
    );
    if let Some(prev) = page.window.prev() {
        println!(
            "  {} metasnap list --start {}",
            style("prev:").dim(),
            prev.start
        );
    }
    if let Some(next) = page.window.next() {
        println!(
            "  {} metasnap list --start {}",
            style("next:").dim(),
            next.start
        );
    }
}
