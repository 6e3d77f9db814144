//! Edit capture and background reconciliation.
//!
//! The user edits titles and notes directly in a rendered `SnapPage`.
//! `EditCapture` snapshots those fields; the `Reconciler` then walks the
//! snap table in one write unit and writes back every record whose stored
//! title or note differs from the snapshot.
//!
//! The follow-up callback runs before any storage work, so a re-render it
//! triggers may still show the old values. Log lines produced during the
//! walk are held until the write unit has finished.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use ms_core::constants::status;
use ms_core::error::{MsError, MsResult};
use ms_models::{RecordStore, Severity, Snap};

use crate::applog::AppLogger;
use crate::encoder::{EncodeRequest, MetadataEncoder};
use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState, StateCell};
use crate::snaps::SnapPage;

/// Editable fields of one snap as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapEdit {
    pub title: String,
    pub note: String,
}

/// Edited fields keyed by snap id.
pub type Snapshot = HashMap<i64, SnapEdit>;

pub struct EditCapture;

impl EditCapture {
    /// Snapshot the editable fields of every snap in the page.
    pub fn capture(page: &SnapPage) -> Snapshot {
        page.items
            .iter()
            .map(|item| {
                (
                    item.id,
                    SnapEdit {
                        title: item.title.clone(),
                        note: item.note.clone(),
                    },
                )
            })
            .collect()
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Snaps whose stored title or note differed from the snapshot.
    pub dirty: usize,
    pub updated: usize,
    pub failed: usize,
    pub message: String,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Tally of the walk inside the write unit.
#[derive(Default)]
struct Pass {
    dirty: usize,
    updated: usize,
    failed: usize,
    notes: Vec<(Severity, String)>,
}

fn apply_edits(
    store: &RecordStore,
    encoder: &dyn MetadataEncoder,
    snapshot: &Snapshot,
) -> (Pass, MsResult<()>) {
    let mut pass = Pass::default();

    let result = store.write(|unit| {
        for entry in unit.cursor::<Snap>() {
            let entry = entry?;
            let id = *entry.key();
            let Some(edit) = snapshot.get(&id) else {
                continue;
            };

            let stored = entry.value();
            if stored.title == edit.title && stored.note == edit.note {
                continue;
            }
            pass.dirty += 1;

            let mut updated = stored.clone();
            updated.title = edit.title.clone();
            updated.note = edit.note.clone();

            match encoder.encode(&EncodeRequest::for_snap(&updated)) {
                Ok(payload) => updated.photo = payload,
                Err(e) => pass.notes.push((
                    Severity::Warning,
                    format!("Photo metadata not updated for snap {id}: {e}"),
                )),
            }

            match entry.update(&updated) {
                Ok(()) => {
                    pass.updated += 1;
                    pass.notes.push((
                        Severity::Debug,
                        format!("Successfully updated a snap with id {id}."),
                    ));
                }
                Err(e) => {
                    pass.failed += 1;
                    pass.notes.push((
                        Severity::Error,
                        format!("Error when attempting to update snap {id}: {e}"),
                    ));
                }
            }
        }
        Ok(())
    });

    (pass, result)
}

pub struct Reconciler {
    state: StateCell,
    store: RecordStore,
    encoder: Arc<dyn MetadataEncoder>,
    logger: AppLogger,
    event_bus: EventBus,
}

impl Reconciler {
    pub fn new(
        store: RecordStore,
        encoder: Arc<dyn MetadataEncoder>,
        logger: AppLogger,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: StateCell::new(),
            store,
            encoder,
            logger,
            event_bus,
        }
    }

    /// Write back edited snaps in the background.
    ///
    /// `followup` runs before this returns and before any storage work.
    /// The returned handle resolves to the report once the write unit has
    /// finished and its log lines are stored.
    pub fn reconcile<F>(&self, snapshot: Snapshot, followup: F) -> JoinHandle<ReconcileReport>
    where
        F: FnOnce(),
    {
        followup();

        let store = self.store.clone();
        let encoder = Arc::clone(&self.encoder);
        let logger = self.logger.clone();
        let event_bus = self.event_bus.clone();

        tokio::spawn(async move {
            debug!("reconciling {} captured snap(s)", snapshot.len());

            let walk = tokio::task::spawn_blocking(move || {
                apply_edits(&store, encoder.as_ref(), &snapshot)
            })
            .await;

            let (pass, result) = match walk {
                Ok(walk) => walk,
                Err(e) => (
                    Pass::default(),
                    Err(MsError::Internal(format!("reconcile task failed: {e}"))),
                ),
            };

            for (severity, line) in pass.notes {
                match severity {
                    Severity::Error => logger.escalate(line).await,
                    _ => logger.log(severity, line).await,
                }
            }

            let mut report = ReconcileReport {
                dirty: pass.dirty,
                updated: pass.updated,
                failed: pass.failed,
                message: String::new(),
            };

            if let Err(e) = result {
                error!("reconcile write unit failed: {e}");
                logger
                    .escalate(format!("Error when attempting to update snaps: {e}"))
                    .await;
                // Nothing in the unit was kept.
                report.updated = 0;
                report.failed = report.dirty.max(1);
            }

            report.message = if report.is_clean() {
                status::EDITS_SAVED.to_string()
            } else {
                status::EDITS_FAILED.to_string()
            };

            info!(
                "reconcile finished: {} dirty, {} updated, {} failed",
                report.dirty, report.updated, report.failed
            );
            event_bus.emit(AppEvent::EditsReconciled {
                updated: report.updated,
                failed: report.failed,
            });
            event_bus.status(report.message.clone());
            report
        })
    }
}

impl Service for Reconciler {
    fn name(&self) -> &str {
        "reconciler"
    }

    fn state(&self) -> ServiceState {
        self.state.get()
    }

    fn init(&self) -> MsResult<()> {
        self.state.set(ServiceState::Running);
        Ok(())
    }

    fn shutdown(&self) -> MsResult<()> {
        self.state.set(ServiceState::Stopped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PageWindow;
    use crate::snaps::EditableSnap;
    use chrono::Utc;

    fn item(id: i64, title: &str, note: &str) -> EditableSnap {
        EditableSnap {
            position: id as usize,
            id,
            title: title.into(),
            note: note.into(),
            has_photo: false,
            captured_at: Utc::now(),
            latitude: None,
            longitude: None,
            maps_url: None,
        }
    }

    #[test]
    fn test_capture_keys_by_id() {
        let page = SnapPage {
            items: vec![item(3, "a", "x"), item(9, "b", "")],
            window: PageWindow::compute(1, 10, 2),
            total: 2,
        };
        let snapshot = EditCapture::capture(&page);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&3], SnapEdit { title: "a".into(), note: "x".into() });
        assert_eq!(snapshot[&9].title, "b");
    }

    #[test]
    fn test_capture_empty_page() {
        let page = SnapPage {
            items: vec![],
            window: PageWindow::compute(1, 10, 0),
            total: 0,
        };
        assert!(EditCapture::capture(&page).is_empty());
    }
}
