//! MetaSnap CLI - Command-line interface for the MetaSnap snap store.
//!
//! Captures geotagged notes and photos into the local store, lets them be
//! browsed and edited a page at a time, and posts them to the configured
//! sync endpoint in batches.

mod commands;

use clap::{Parser, Subcommand};
use tracing::info;

use ms_core::config::{AppConfig, ConfigHandle};
use ms_core::error::MsResult;
use ms_core::logging;

/// MetaSnap - local-first snap capture and sync.
#[derive(Parser)]
#[command(
    name = "metasnap",
    version,
    about = "MetaSnap snap capture CLI",
    long_about = "A command-line interface for MetaSnap.\n\
                   Capture snaps locally, edit them page by page, and post them \
                   to your sync endpoint."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a new snap.
    Add {
        /// Snap title (defaults to the configured default title).
        #[arg(short, long)]
        title: Option<String>,
        /// Free-text note.
        #[arg(short, long, default_value = "")]
        note: String,
        /// Image file to attach.
        #[arg(short, long)]
        photo: Option<std::path::PathBuf>,
        /// Latitude in decimal degrees.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude in decimal degrees.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
    /// Show one page of snaps.
    List {
        /// Position of the first snap to show (1-based).
        #[arg(short, long, default_value = "1")]
        start: usize,
    },
    /// Edit the title or note of a snap.
    Edit {
        /// Snap id.
        id: i64,
        /// New title.
        #[arg(short, long)]
        title: Option<String>,
        /// New note.
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Delete a snap.
    Delete {
        /// Snap id.
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Post every snap to the sync endpoint.
    Post,
    /// View and modify settings.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// View or clear the application log.
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Database management commands.
    Db {
        #[command(subcommand)]
        action: commands::db::DbAction,
    },
}

#[tokio::main]
async fn main() -> MsResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from_file(std::path::Path::new(path))?,
        None => AppConfig::load_default()?,
    };

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let log_dir = config.effective_log_dir()?;
    let _guard = logging::init_logging(&log_level, &log_dir, config.logging.json_output)?;

    let config_handle = ConfigHandle::new(config);

    info!("MetaSnap CLI v{}", ms_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Add { title, note, photo, lat, lon } => {
            commands::add::run(config_handle, title, note, photo, lat.zip(lon), cli.format).await
        }
        Commands::List { start } => {
            commands::list::run(config_handle, start, cli.format).await
        }
        Commands::Edit { id, title, note } => {
            commands::edit::run(config_handle, id, title, note, cli.format).await
        }
        Commands::Delete { id, yes } => {
            commands::delete::run(config_handle, id, yes, cli.format).await
        }
        Commands::Post => {
            commands::post::run(config_handle, cli.format).await
        }
        Commands::Config { action } => {
            commands::config::run(config_handle, action, cli.format).await
        }
        Commands::Log { action } => {
            commands::log::run(config_handle, action, cli.format).await
        }
        Commands::Db { action } => {
            commands::db::run(config_handle, action, cli.format).await
        }
    }
}
