//! MetaSnap Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other MetaSnap crates:
//! - Process configuration (sync endpoint, database, logging)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Platform directory resolution
//! - Common constants and setting key names

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ConfigHandle};
pub use error::{MsError, MsResult};
pub use logging::init_logging;
pub use platform::Platform;
