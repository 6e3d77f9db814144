//! End-to-end flow integration tests.
//!
//! Tests the complete pipeline a user drives: capture a snap, edit it in
//! a rendered window, reconcile, and post everything, checking the events
//! each step emits along the way.

mod common;

use std::sync::Arc;

use ms_api::BatchOutcome;
use ms_core::constants::{setting_keys, status};
use ms_models::{ConfigEntry, Location, Snap};
use ms_services::{
    AppEvent, EditCapture, PageRange, PassthroughEncoder, SaveOutcome, SnapDraft, SyncOutcome,
};

// ---- Capture, edit, post ----

#[tokio::test]
async fn e2e_capture_edit_and_post() {
    let transport = Arc::new(common::FakeTransport::scripted(vec![BatchOutcome::Success {
        message: "1 snap mailed".into(),
    }]));
    let (registry, _dir) =
        common::open_registry_with(transport.clone(), Arc::new(PassthroughEncoder)).await;
    let mut rx = registry.event_bus.subscribe();

    registry
        .resolver
        .save(&[ConfigEntry::new(setting_keys::MAIL_TO, "field@example.com")])
        .await
        .unwrap();

    // 1. Capture
    let title = format!("{}Pump house", registry.snaps.default_title().await);
    let SaveOutcome::Saved { id } = registry
        .snaps
        .save_snap(SnapDraft {
            title: title.clone(),
            note: "valve leaking".into(),
            photo: String::new(),
            location: Location::Known { latitude: 48.85, longitude: 2.35 },
        })
        .await
        .unwrap()
    else {
        panic!("snap was not saved");
    };

    // 2. Edit in the window holding the new snap
    let position = registry.snaps.position_of(id).unwrap().unwrap();
    let mut page = registry.snaps.render_page(PageRange::containing(position)).unwrap();
    page.item_mut(id).unwrap().note = "valve replaced".into();

    let mut rerendered = None;
    let report = registry
        .reconciler
        .reconcile(EditCapture::capture(&page), || {
            rerendered = Some(registry.snaps.render_page(page.window.range()).unwrap());
        })
        .await
        .unwrap();
    assert_eq!(report.message, status::EDITS_SAVED);
    assert_eq!(rerendered.unwrap().items[0].note, "valve leaking");

    // 3. Post
    let outcome = registry.sync.post_all().await.unwrap();
    assert_eq!(outcome.message(), "1 snap mailed");

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mail_to, "field@example.com");
    let payload = &calls[0].batch[0];
    assert_eq!(payload.title, title);
    assert_eq!(payload.note, "valve replaced");

    // 4. Events in order
    let mut labels = Vec::new();
    while let Ok(event) = rx.try_recv() {
        labels.push(match event {
            AppEvent::ConfigSaved { .. } => "config",
            AppEvent::SnapSaved { id: saved } => {
                assert_eq!(saved, id);
                "saved"
            }
            AppEvent::EditsReconciled { updated, .. } => {
                assert_eq!(updated, 1);
                "reconciled"
            }
            AppEvent::BatchPosted { .. } => "batch",
            AppEvent::SyncFinished { .. } => "finished",
            AppEvent::Status { .. } => "status",
            other => panic!("unexpected event: {other:?}"),
        });
    }
    assert_eq!(
        labels,
        vec!["config", "status", "saved", "reconciled", "status", "batch", "finished", "status"]
    );
}

#[tokio::test]
async fn e2e_deleted_snap_is_not_posted() {
    let transport = Arc::new(common::FakeTransport::accepting());
    let (registry, _dir) =
        common::open_registry_with(transport.clone(), Arc::new(PassthroughEncoder)).await;
    let ids = common::seed_snaps(&registry.store, 3);
    registry
        .resolver
        .save(&[ConfigEntry::new(setting_keys::MAIL_TO, "field@example.com")])
        .await
        .unwrap();

    let mut rx = registry.event_bus.subscribe();
    assert!(registry.snaps.delete_snap(ids[0]).await.unwrap());
    match rx.recv().await.unwrap() {
        AppEvent::SnapDeleted { id } => assert_eq!(id, ids[0]),
        other => panic!("unexpected event: {other:?}"),
    }

    let outcome = registry.sync.post_all().await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed(_)));
    let titles: Vec<String> = transport.calls()[0]
        .batch
        .iter()
        .map(|p| p.title.clone())
        .collect();
    assert_eq!(titles, vec!["snap 2".to_string(), "snap 3".to_string()]);
}

#[tokio::test]
async fn e2e_posted_payload_uses_wire_names() {
    let transport = Arc::new(common::FakeTransport::accepting());
    let (registry, _dir) =
        common::open_registry_with(transport.clone(), Arc::new(PassthroughEncoder)).await;
    common::seed_snaps(&registry.store, 2);
    registry
        .resolver
        .save(&[ConfigEntry::new(setting_keys::MAIL_TO, "field@example.com")])
        .await
        .unwrap();

    registry.sync.post_all().await.unwrap();
    let batch = transport.calls()[0].batch.clone();
    let json = serde_json::to_value(&batch).unwrap();

    assert_eq!(json[0]["latitude"], "Unknown");
    assert_eq!(json[0]["longitude"], "Unknown");
    assert_eq!(json[1]["latitude"], 51.5);
    assert!(json[0].get("photoasdataurl").is_some());
    assert!(json[0].get("datetime").is_some());

    let stored = registry.store.load_all::<Snap>().unwrap();
    assert_eq!(batch[1], stored[1].to_payload());
}
