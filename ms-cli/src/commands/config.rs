//! Settings commands.

use clap::Subcommand;
use console::style;

use ms_core::config::{AppConfig, ConfigHandle};
use ms_core::constants::{MAX_APP_LOG_LEVEL, MAX_BATCH_SIZE, MIN_BATCH_SIZE};
use ms_core::error::MsResult;
use ms_services::config::split_addresses;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current settings.
    Show,
    /// Change one or more settings. Anything not given keeps its value.
    Set {
        /// Address to send snaps to. Repeat for several; replaces the list.
        #[arg(long = "mail-to")]
        mail_to: Vec<String>,
        /// Remove every configured address.
        #[arg(long, conflicts_with = "mail_to")]
        clear_mail_to: bool,
        /// Lowest severity kept in the application log (0 debug .. 3 error).
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=MAX_APP_LOG_LEVEL as i64))]
        log_level: Option<u8>,
        /// Title pre-filled for new snaps.
        #[arg(long)]
        default_title: Option<String>,
        /// Snaps sent per request.
        #[arg(
            long,
            value_parser = clap::value_parser!(u32)
                .range(MIN_BATCH_SIZE as i64..=MAX_BATCH_SIZE as i64)
        )]
        batch_size: Option<u32>,
    },
}

pub async fn run(config: ConfigHandle, action: ConfigAction, format: OutputFormat) -> MsResult<()> {
    let registry = super::open_registry(&config).await?;

    match action {
        ConfigAction::Show => {
            let resolved = registry.resolver.load()?;
            let (endpoint, db_path) = {
                let cfg = config.read().await;
                (
                    AppConfig::sanitize_endpoint(&cfg.server.endpoint),
                    cfg.effective_db_path()?,
                )
            };

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({
                        "settings": resolved,
                        "endpoint": endpoint,
                        "database": db_path.display().to_string(),
                    }));
                }
                OutputFormat::Text => {
                    println!("{}", style("Settings").bold().underlined());
                    let addresses = resolved.mail_to_list();
                    if addresses.is_empty() {
                        println!("  Mail to:        {}", style("(not set)").dim());
                    } else {
                        for (i, address) in addresses.iter().enumerate() {
                            let label = if i == 0 { "Mail to:" } else { "" };
                            println!("  {label:<15} {address}");
                        }
                    }
                    println!("  App log level:  {}", resolved.app_log_level);
                    println!("  Default title:  {:?}", resolved.default_title);
                    println!("  Batch size:     {}", resolved.batch_size);
                    println!();
                    println!("{}", style("Process").bold().underlined());
                    println!("  Endpoint:       {endpoint}");
                    println!("  Database:       {}", db_path.display());
                }
            }
        }
        ConfigAction::Set {
            mail_to,
            clear_mail_to,
            log_level,
            default_title,
            batch_size,
        } => {
            if mail_to.is_empty()
                && !clear_mail_to
                && log_level.is_none()
                && default_title.is_none()
                && batch_size.is_none()
            {
                println!("  Nothing to change. See `metasnap config set --help`.");
                return Ok(());
            }

            let current = registry.resolver.load()?;
            let addresses = if clear_mail_to {
                Vec::new()
            } else if mail_to.is_empty() {
                current.mail_to_list()
            } else {
                mail_to.iter().flat_map(|a| split_addresses(a)).collect()
            };

            registry
                .resolver
                .save_settings(
                    &addresses,
                    log_level.unwrap_or(current.app_log_level),
                    default_title.as_deref().unwrap_or(&current.default_title),
                    batch_size.unwrap_or(current.batch_size),
                )
                .await?;

            let saved = registry.resolver.load()?;
            match format {
                OutputFormat::Json => super::print_json(&saved)?,
                OutputFormat::Text => {
                    println!(
                        "  {} {}",
                        style("OK").green().bold(),
                        ms_core::constants::status::CONFIG_SAVED
                    );
                    if !addresses.is_empty() && saved.mail_to_list().len() < addresses.len() {
                        println!(
                            "  {} Some addresses were too long and were dropped. \
                             See `metasnap log show`.",
                            style("WARN").yellow().bold()
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
