//! Persistent application log.
//!
//! Every message goes to `tracing`. Messages at or above the configured
//! `appLogLevel` are also stored in the `applog` table, where the user can
//! read them. Escalated messages are always stored.

use tracing::{debug, error, info, warn};

use ms_core::error::MsResult;
use ms_models::{LogEntry, RecordStore, Severity};

use crate::config::ConfigMirror;

#[derive(Clone)]
pub struct AppLogger {
    store: RecordStore,
    mirror: ConfigMirror,
}

impl AppLogger {
    pub fn new(store: RecordStore, mirror: ConfigMirror) -> Self {
        Self { store, mirror }
    }

    /// Log a message, storing it if it meets the threshold.
    pub async fn log(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        trace(severity, &message);

        let threshold = self.mirror.app_log_level().await;
        if severity.rank() < threshold {
            return;
        }
        self.persist(severity, message);
    }

    pub async fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message).await
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message).await
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message).await
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message).await
    }

    /// Record an error regardless of the threshold.
    pub async fn escalate(&self, message: impl Into<String>) {
        let message = message.into();
        error!(target: "applog", "{message}");
        self.persist(Severity::Error, message);
    }

    /// Delete every stored entry. Returns how many were removed.
    pub fn clear(&self) -> MsResult<usize> {
        let removed = self.store.clear::<LogEntry>()?;
        info!("cleared {removed} application log entries");
        Ok(removed)
    }

    /// Stored entries, oldest first.
    pub fn entries(&self) -> MsResult<Vec<LogEntry>> {
        self.store.load_all::<LogEntry>()
    }

    fn persist(&self, severity: Severity, message: String) {
        // The logger has nowhere else to report its own failures.
        if let Err(e) = self.store.add(&LogEntry::now(severity, message)) {
            error!("failed to store application log entry: {e}");
        }
    }
}

fn trace(severity: Severity, message: &str) {
    match severity {
        Severity::Debug => debug!(target: "applog", "{message}"),
        Severity::Info => info!(target: "applog", "{message}"),
        Severity::Warning => warn!(target: "applog", "{message}"),
        Severity::Error => error!(target: "applog", "{message}"),
    }
}
