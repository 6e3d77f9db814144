//! Typed event bus for intra-service communication.
//!
//! Uses tokio broadcast channels to decouple services from one another.
//! Any service can emit events without knowing who is listening, and any
//! number of subscribers can independently consume events. `Status` is the
//! line of text a front end shows the user after an operation.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// All application-level event types that flow through the event bus.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A snap was stored.
    SnapSaved {
        id: i64,
    },
    /// A snap was removed.
    SnapDeleted {
        id: i64,
    },
    /// A background reconciliation pass finished.
    EditsReconciled {
        updated: usize,
        failed: usize,
    },
    /// One batch of snaps was sent to the sync endpoint.
    BatchPosted {
        index: usize,
        size: usize,
        success: bool,
    },
    /// A post of all snaps finished.
    SyncFinished {
        posted: usize,
        failed: usize,
        message: String,
    },
    /// Settings were written.
    ConfigSaved {
        names: Vec<String>,
    },
    /// The application log was emptied.
    LogCleared {
        removed: usize,
    },
    /// Text to show the user.
    Status {
        message: String,
    },
}

/// Application-wide event bus backed by a tokio broadcast channel.
///
/// Every subscriber gets every event. Slow subscribers that fall behind
/// receive a `Lagged` error and may miss events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    /// Shorthand for emitting a `Status` event.
    pub fn status(&self, message: impl Into<String>) {
        self.emit(AppEvent::Status {
            message: message.into(),
        });
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Human-readable label for an event (for logging).
fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::SnapSaved { .. } => "SnapSaved",
        AppEvent::SnapDeleted { .. } => "SnapDeleted",
        AppEvent::EditsReconciled { .. } => "EditsReconciled",
        AppEvent::BatchPosted { .. } => "BatchPosted",
        AppEvent::SyncFinished { .. } => "SyncFinished",
        AppEvent::ConfigSaved { .. } => "ConfigSaved",
        AppEvent::LogCleared { .. } => "LogCleared",
        AppEvent::Status { .. } => "Status",
    }
}
