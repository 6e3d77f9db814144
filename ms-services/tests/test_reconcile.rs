//! Integration tests for edit capture and background reconciliation.

mod common;

use std::sync::Arc;

use ms_core::constants::status;
use ms_models::{Severity, Snap};
use ms_services::{AppEvent, EditCapture, PageRange, SnapEdit, Snapshot};

fn audit_updates(registry: &ms_services::ServiceRegistry) {
    registry
        .database
        .conn()
        .unwrap()
        .execute_batch(
            "CREATE TABLE update_audit (snap_id INTEGER);
             CREATE TRIGGER audit_snap_update AFTER UPDATE ON snaps
             BEGIN INSERT INTO update_audit VALUES (NEW.id); END;",
        )
        .unwrap();
}

fn audited_ids(registry: &ms_services::ServiceRegistry) -> Vec<i64> {
    let conn = registry.database.conn().unwrap();
    let mut stmt = conn
        .prepare("SELECT snap_id FROM update_audit ORDER BY snap_id")
        .unwrap();
    let ids = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    ids
}

fn title_of(registry: &ms_services::ServiceRegistry, id: i64) -> String {
    registry.store.get::<Snap>(&id).unwrap().unwrap().title
}

// ---- Capture and write-back ----

#[tokio::test]
async fn edited_titles_and_notes_are_written_back() {
    let (registry, _dir) = common::open_registry().await;
    let ids = common::seed_snaps(&registry.store, 12);

    let mut page = registry.snaps.render_page(PageRange::first()).unwrap();
    page.item_mut(ids[0]).unwrap().title = "renamed".into();
    page.item_mut(ids[4]).unwrap().note = "new note".into();

    let report = registry
        .reconciler
        .reconcile(EditCapture::capture(&page), || {})
        .await
        .unwrap();

    assert_eq!(report.dirty, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.message, status::EDITS_SAVED);

    assert_eq!(title_of(&registry, ids[0]), "renamed");
    let fifth = registry.store.get::<Snap>(&ids[4]).unwrap().unwrap();
    assert_eq!(fifth.note, "new note");
    assert_eq!(fifth.title, "snap 5");
}

#[tokio::test]
async fn unchanged_snapshot_causes_no_writes_or_encodes() {
    let encoder = Arc::new(common::CountingEncoder::default());
    let (registry, _dir) = common::open_registry_with(
        Arc::new(common::FakeTransport::accepting()),
        encoder.clone(),
    )
    .await;
    common::seed_snaps(&registry.store, 15);
    audit_updates(&registry);

    let page = registry.snaps.render_page(PageRange::first()).unwrap();
    let report = registry
        .reconciler
        .reconcile(EditCapture::capture(&page), || {})
        .await
        .unwrap();

    assert_eq!(report.dirty, 0);
    assert_eq!(report.message, status::EDITS_SAVED);
    assert!(audited_ids(&registry).is_empty());
    assert_eq!(encoder.calls(), 0);
}

#[tokio::test]
async fn only_differing_records_are_updated() {
    let encoder = Arc::new(common::CountingEncoder::default());
    let (registry, _dir) = common::open_registry_with(
        Arc::new(common::FakeTransport::accepting()),
        encoder.clone(),
    )
    .await;
    let ids = common::seed_snaps(&registry.store, 25);
    audit_updates(&registry);

    let mut page = registry.snaps.render_page(PageRange::starting_at(11)).unwrap();
    page.item_mut(ids[12]).unwrap().title = "thirteen".into();

    registry
        .reconciler
        .reconcile(EditCapture::capture(&page), || {})
        .await
        .unwrap();

    assert_eq!(audited_ids(&registry), vec![ids[12]]);
    assert_eq!(encoder.calls(), 1);
    assert_eq!(title_of(&registry, ids[11]), "snap 12");
}

#[tokio::test]
async fn snapshot_ids_missing_from_store_are_skipped() {
    let (registry, _dir) = common::open_registry().await;
    let ids = common::seed_snaps(&registry.store, 3);

    let mut snapshot = Snapshot::new();
    snapshot.insert(ids[1], SnapEdit { title: "kept".into(), note: String::new() });
    snapshot.insert(9_999, SnapEdit { title: "ghost".into(), note: String::new() });

    let report = registry.reconciler.reconcile(snapshot, || {}).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(registry.snaps.count().unwrap(), 3);
    assert_eq!(title_of(&registry, ids[1]), "kept");
}

#[tokio::test]
async fn followup_runs_before_storage_work() {
    let (registry, _dir) = common::open_registry().await;
    let ids = common::seed_snaps(&registry.store, 2);

    let mut page = registry.snaps.render_page(PageRange::first()).unwrap();
    page.item_mut(ids[0]).unwrap().title = "after".into();

    let mut seen_in_followup = None;
    let handle = registry
        .reconciler
        .reconcile(EditCapture::capture(&page), || {
            seen_in_followup = Some(title_of(&registry, ids[0]));
        });

    assert_eq!(seen_in_followup.as_deref(), Some("snap 1"));
    handle.await.unwrap();
    assert_eq!(title_of(&registry, ids[0]), "after");
}

// ---- Failures ----

#[tokio::test]
async fn encoder_failure_still_saves_text_and_warns() {
    let (registry, _dir) = common::open_registry_with(
        Arc::new(common::FakeTransport::accepting()),
        Arc::new(common::FailingEncoder),
    )
    .await;
    let ids = common::seed_snaps(&registry.store, 3);
    let photo_before = registry.store.get::<Snap>(&ids[2]).unwrap().unwrap().photo;

    let mut page = registry.snaps.render_page(PageRange::first()).unwrap();
    page.item_mut(ids[2]).unwrap().title = "with photo".into();

    let report = registry
        .reconciler
        .reconcile(EditCapture::capture(&page), || {})
        .await
        .unwrap();

    assert_eq!(report.message, status::EDITS_SAVED);
    let stored = registry.store.get::<Snap>(&ids[2]).unwrap().unwrap();
    assert_eq!(stored.title, "with photo");
    assert_eq!(stored.photo, photo_before);

    let entries = registry.logger.entries().unwrap();
    assert!(entries
        .iter()
        .any(|e| e.severity == Severity::Warning && e.message.contains(&ids[2].to_string())));
}

#[tokio::test]
async fn rejected_record_fails_but_others_are_saved() {
    let (registry, _dir) = common::open_registry().await;
    let ids = common::seed_snaps(&registry.store, 4);
    registry
        .database
        .conn()
        .unwrap()
        .execute_batch(&format!(
            "CREATE TRIGGER reject_snap_update BEFORE UPDATE ON snaps WHEN OLD.id = {}
             BEGIN SELECT RAISE(ABORT, 'update rejected'); END;",
            ids[1]
        ))
        .unwrap();

    let mut page = registry.snaps.render_page(PageRange::first()).unwrap();
    for id in &ids {
        page.item_mut(*id).unwrap().title = format!("edited {id}");
    }

    let mut rx = registry.event_bus.subscribe();
    let report = registry
        .reconciler
        .reconcile(EditCapture::capture(&page), || {})
        .await
        .unwrap();

    assert_eq!(report.dirty, 4);
    assert_eq!(report.updated, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.message, status::EDITS_FAILED);
    assert_eq!(title_of(&registry, ids[1]), "snap 2");
    assert_eq!(title_of(&registry, ids[3]), format!("edited {}", ids[3]));

    let errors: Vec<_> = registry
        .logger
        .entries()
        .unwrap()
        .into_iter()
        .filter(|e| e.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains(&ids[1].to_string()));

    match rx.recv().await.unwrap() {
        AppEvent::EditsReconciled { updated, failed } => assert_eq!((updated, failed), (3, 1)),
        other => panic!("unexpected event: {other:?}"),
    }
    match rx.recv().await.unwrap() {
        AppEvent::Status { message } => assert_eq!(message, status::EDITS_FAILED),
        other => panic!("unexpected event: {other:?}"),
    }
}
