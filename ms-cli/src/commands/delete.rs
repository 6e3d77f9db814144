//! Snap delete command.

use console::style;
use dialoguer::Confirm;

use ms_core::config::ConfigHandle;
use ms_core::error::MsResult;
use crate::OutputFormat;

/// Run the delete command.
pub async fn run(config: ConfigHandle, id: i64, yes: bool, format: OutputFormat) -> MsResult<()> {
    let registry = super::open_registry(&config).await?;

    let Some(snap) = registry.snaps.get(id)? else {
        match format {
            OutputFormat::Json => println!("{}", serde_json::json!({"id": id, "deleted": false})),
            OutputFormat::Text => println!("  No snap with id {id}."),
        }
        return Ok(());
    };

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("  Delete snap {id} \"{}\"?", snap.title))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("  Delete cancelled.");
            return Ok(());
        }
    }

    let deleted = registry.snaps.delete_snap(id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({"id": id, "deleted": deleted})),
        OutputFormat::Text => {
            println!("  {} Deleted snap {}.", style("OK").green().bold(), id);
        }
    }

    Ok(())
}
