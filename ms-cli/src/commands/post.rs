//! Post command.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use ms_core::config::ConfigHandle;
use ms_core::error::MsResult;
use ms_services::{AppEvent, SyncOutcome};
use crate::OutputFormat;

/// Run the post command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> MsResult<()> {
    let registry = super::open_registry(&config).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("Posting snaps...");

    let mut rx = registry.event_bus.subscribe();
    let pb_events = pb.clone();
    let listener = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let AppEvent::BatchPosted { index, size, success } = event {
                let result = if success { "sent" } else { "failed" };
                pb_events.set_message(format!("Batch {} ({size} snaps) {result}", index + 1));
            }
        }
    });

    let outcome = registry.sync.post_all().await;
    listener.abort();
    pb.finish_and_clear();
    let outcome = outcome?;

    let (status, report) = match &outcome {
        SyncOutcome::NothingToPost => ("nothing_to_post", None),
        SyncOutcome::MissingAddress => ("missing_address", None),
        SyncOutcome::AlreadyRunning => ("already_running", None),
        SyncOutcome::Completed(report) if report.failed == 0 => ("complete", Some(report)),
        SyncOutcome::Completed(report) if report.posted > 0 => ("partial", Some(report)),
        SyncOutcome::Completed(report) => ("failed", Some(report)),
    };

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::json!({
                "status": status,
                "message": outcome.message(),
            });
            if let Some(report) = report {
                value["batches"] = report.batches.into();
                value["posted"] = report.posted.into();
                value["failed"] = report.failed.into();
            }
            println!("{value}");
        }
        OutputFormat::Text => {
            let label = match status {
                "complete" => style("OK").green().bold(),
                "partial" | "missing_address" | "already_running" => style("WARN").yellow().bold(),
                "failed" => style("FAIL").red().bold(),
                _ => style("--").dim(),
            };
            println!("  {} {}", label, outcome.message());
            if let Some(report) = report {
                println!(
                    "  Batches: {} posted, {} failed of {}",
                    report.posted, report.failed, report.batches
                );
            }
        }
    }

    Ok(())
}
