//! Snap capture, listing, and deletion.
//!
//! Saving takes a `SnapDraft` from the capture form, drops it when nothing
//! beyond the pre-filled title was entered, stamps it with the current time
//! and stores it. Listing renders one `SnapPage` window at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use ms_core::error::MsResult;
use ms_models::{Location, RecordStore, Snap};

use crate::affordance::Affordance;
use crate::applog::AppLogger;
use crate::config::ConfigMirror;
use crate::encoder::{EncodeRequest, MetadataEncoder};
use crate::event_bus::{AppEvent, EventBus};
use crate::pagination::{PageRange, PageWindow};
use crate::service::{Service, ServiceState, StateCell};

/// What the user entered on the capture form.
#[derive(Debug, Clone, Default)]
pub struct SnapDraft {
    pub title: String,
    pub note: String,
    /// Photo as a `data:` URL. Anything else is discarded.
    pub photo: String,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { id: i64 },
    /// Nothing worth keeping was entered.
    Skipped,
    /// Another save is still running.
    Busy,
}

/// One snap in a rendered window, with the fields the user may edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditableSnap {
    /// 1-based position in key order.
    pub position: usize,
    pub id: i64,
    pub title: String,
    pub note: String,
    pub has_photo: bool,
    pub captured_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub maps_url: Option<String>,
}

impl EditableSnap {
    fn from_snap(position: usize, id: i64, snap: Snap) -> Self {
        let (latitude, longitude) = snap.location.columns();
        Self {
            position,
            id,
            has_photo: snap.has_photo(),
            maps_url: snap.location.maps_url(),
            title: snap.title,
            note: snap.note,
            captured_at: snap.captured_at,
            latitude,
            longitude,
        }
    }
}

/// A rendered window of snaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapPage {
    pub items: Vec<EditableSnap>,
    pub window: PageWindow,
    pub total: usize,
}

impl SnapPage {
    pub fn item_mut(&mut self, id: i64) -> Option<&mut EditableSnap> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

pub struct SnapService {
    state: StateCell,
    store: RecordStore,
    mirror: ConfigMirror,
    encoder: Arc<dyn MetadataEncoder>,
    logger: AppLogger,
    event_bus: EventBus,
    save_affordance: Affordance,
}

impl SnapService {
    pub fn new(
        store: RecordStore,
        mirror: ConfigMirror,
        encoder: Arc<dyn MetadataEncoder>,
        logger: AppLogger,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: StateCell::new(),
            store,
            mirror,
            encoder,
            logger,
            event_bus,
            save_affordance: Affordance::new("save snap"),
        }
    }

    /// Title pre-filled on the capture form.
    pub async fn default_title(&self) -> String {
        self.mirror.default_title().await
    }

    pub fn count(&self) -> MsResult<usize> {
        self.store.count::<Snap>()
    }

    /// Store a snap from the capture form.
    pub async fn save_snap(&self, draft: SnapDraft) -> MsResult<SaveOutcome> {
        let Some(_guard) = self.save_affordance.suspend() else {
            return Ok(SaveOutcome::Busy);
        };

        let photo = if draft.photo.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
            draft.photo
        } else {
            if !draft.photo.is_empty() {
                debug!("discarding photo that is not a data URL");
            }
            String::new()
        };

        let default_title = self.mirror.default_title().await;
        let title = draft.title.trim();
        let untitled = title.is_empty() || title == default_title.trim();
        if untitled && draft.note.trim().is_empty() && photo.is_empty() {
            debug!("nothing entered, snap not saved");
            return Ok(SaveOutcome::Skipped);
        }

        let mut snap = Snap::new(draft.title, draft.note, photo, draft.location, Utc::now());
        match self.encoder.encode(&EncodeRequest::for_snap(&snap)) {
            Ok(payload) => snap.photo = payload,
            Err(e) => {
                self.logger
                    .warning(format!("Photo metadata not written, keeping original photo: {e}"))
                    .await
            }
        }

        let id = match self.store.add(&snap) {
            Ok(id) => id,
            Err(e) => {
                self.logger
                    .escalate(format!("Error when attempting to save snap: {e}"))
                    .await;
                return Err(e);
            }
        };

        info!("saved snap {id}");
        self.logger.debug(format!("Saved snap with id {id}.")).await;
        self.event_bus.emit(AppEvent::SnapSaved { id });
        Ok(SaveOutcome::Saved { id })
    }

    /// Delete a snap by id. Returns whether it existed.
    pub async fn delete_snap(&self, id: i64) -> MsResult<bool> {
        match self.store.delete::<Snap>(&id) {
            Ok(existed) => {
                if existed {
                    info!("deleted snap {id}");
                    self.event_bus.emit(AppEvent::SnapDeleted { id });
                }
                Ok(existed)
            }
            Err(e) => {
                self.logger
                    .escalate(format!("Error when attempting to delete snap {id}: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    pub fn get(&self, id: i64) -> MsResult<Option<Snap>> {
        self.store.get::<Snap>(&id)
    }

    /// 1-based position of a snap in key order.
    pub fn position_of(&self, id: i64) -> MsResult<Option<usize>> {
        for (index, snap) in self.store.iterate::<Snap>().enumerate() {
            if snap?.id == Some(id) {
                return Ok(Some(index + 1));
            }
        }
        Ok(None)
    }

    /// Render the snaps whose positions fall in `range`.
    ///
    /// The whole table is walked so the total, and with it `has_next`, is
    /// exact.
    pub fn render_page(&self, range: PageRange) -> MsResult<SnapPage> {
        let mut items = Vec::new();
        let mut total_seen = 0;

        for snap in self.store.iterate::<Snap>() {
            let snap = snap?;
            total_seen += 1;
            if !range.contains(total_seen) {
                continue;
            }
            if let Some(id) = snap.id {
                items.push(EditableSnap::from_snap(total_seen, id, snap));
            }
        }

        Ok(SnapPage {
            items,
            window: PageWindow::compute(range.start, range.end, total_seen),
            total: total_seen,
        })
    }
}

impl Service for SnapService {
    fn name(&self) -> &str {
        "snaps"
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
