//! Integration tests for batched posting.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use ms_api::{BatchOutcome, BatchTransport};
use ms_core::constants::{setting_keys, status, DEFAULT_SNAP_TITLE};
use ms_core::error::{MsError, MsResult};
use ms_models::{ConfigEntry, Severity, SnapPayload};
use ms_services::{AppEvent, PassthroughEncoder, ServiceRegistry, SyncOutcome};

async fn registry_with(
    transport: Arc<common::FakeTransport>,
) -> (ServiceRegistry, tempfile::TempDir) {
    common::open_registry_with(transport, Arc::new(PassthroughEncoder)).await
}

async fn set_mail_to(registry: &ServiceRegistry, address: &str) {
    registry
        .resolver
        .save(&[ConfigEntry::new(setting_keys::MAIL_TO, address)])
        .await
        .unwrap();
}

fn report_of(outcome: SyncOutcome) -> ms_services::SyncReport {
    match outcome {
        SyncOutcome::Completed(report) => report,
        other => panic!("expected a completed post, got {other:?}"),
    }
}

// ---- Preconditions ----

#[tokio::test]
async fn nothing_to_post_makes_no_calls() {
    let transport = Arc::new(common::FakeTransport::accepting());
    let (registry, _dir) = registry_with(transport.clone()).await;
    set_mail_to(&registry, "ops@example.com").await;

    let outcome = registry.sync.post_all().await.unwrap();
    assert_eq!(outcome, SyncOutcome::NothingToPost);
    assert_eq!(outcome.message(), status::NOTHING_TO_POST);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn missing_address_makes_no_calls() {
    let transport = Arc::new(common::FakeTransport::accepting());
    let (registry, _dir) = registry_with(transport.clone()).await;
    common::seed_snaps(&registry.store, 5);

    let outcome = registry.sync.post_all().await.unwrap();
    assert_eq!(outcome, SyncOutcome::MissingAddress);
    assert_eq!(transport.call_count(), 0);

    set_mail_to(&registry, "   ").await;
    let outcome = registry.sync.post_all().await.unwrap();
    assert_eq!(outcome, SyncOutcome::MissingAddress);
    assert_eq!(transport.call_count(), 0);
}

// ---- Batching ----

#[tokio::test]
async fn partial_failure_reports_partial_post() {
    let transport = Arc::new(common::FakeTransport::scripted(vec![
        BatchOutcome::Success { message: "10 snaps mailed".into() },
        BatchOutcome::Success { message: "10 snaps mailed".into() },
        BatchOutcome::ServerError { status: 500, message: "mail relay down".into() },
    ]));
    let (registry, _dir) = registry_with(transport.clone()).await;
    common::seed_snaps(&registry.store, 23);
    set_mail_to(&registry, "ops@example.com;lead@example.com").await;

    let report = report_of(registry.sync.post_all().await.unwrap());
    assert_eq!(report.batches, 3);
    assert_eq!(report.posted, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.message, status::PARTIAL_POST);

    assert_eq!(transport.batch_sizes(), vec![10, 10, 3]);
    let calls = transport.calls();
    assert!(calls.iter().all(|c| c.mail_to == "ops@example.com;lead@example.com"));

    let titles: Vec<String> = calls
        .iter()
        .flat_map(|c| c.batch.iter().map(|p| p.title.clone()))
        .collect();
    let expected: Vec<String> = (1..=23).map(|i| format!("snap {i}")).collect();
    assert_eq!(titles, expected);

    let entries = registry.logger.entries().unwrap();
    assert!(entries
        .iter()
        .any(|e| e.severity == Severity::Error && e.message == "mail relay down"));
}

#[tokio::test]
async fn configured_batch_size_is_used() {
    let transport = Arc::new(common::FakeTransport::accepting());
    let (registry, _dir) = registry_with(transport.clone()).await;
    common::seed_snaps(&registry.store, 23);
    registry
        .resolver
        .save_settings(&["ops@example.com".to_string()], 1, DEFAULT_SNAP_TITLE, 20)
        .await
        .unwrap();

    let report = report_of(registry.sync.post_all().await.unwrap());
    assert_eq!(report.batches, 2);
    assert_eq!(transport.batch_sizes(), vec![20, 3]);
}

#[tokio::test]
async fn all_success_reports_last_server_message() {
    let transport = Arc::new(common::FakeTransport::scripted(vec![
        BatchOutcome::Success { message: "first".into() },
        BatchOutcome::Success { message: "second".into() },
    ]));
    let (registry, _dir) = registry_with(transport.clone()).await;
    common::seed_snaps(&registry.store, 12);
    set_mail_to(&registry, "ops@example.com").await;

    let outcome = registry.sync.post_all().await.unwrap();
    assert_eq!(outcome.message(), "second");
    let report = report_of(outcome);
    assert_eq!((report.posted, report.failed), (2, 0));
}

#[tokio::test]
async fn unreachable_server_is_logged_at_info() {
    let unreachable = || BatchOutcome::Unreachable { message: status::UNREACHABLE.into() };
    let transport = Arc::new(common::FakeTransport::scripted(vec![unreachable(), unreachable()]));
    let (registry, _dir) = registry_with(transport.clone()).await;
    common::seed_snaps(&registry.store, 11);
    set_mail_to(&registry, "ops@example.com").await;

    let report = report_of(registry.sync.post_all().await.unwrap());
    assert_eq!((report.posted, report.failed), (0, 2));
    assert_eq!(report.message, status::UNREACHABLE);
    assert_eq!(transport.call_count(), 2);

    let entries = registry.logger.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.severity == Severity::Info));
}

#[tokio::test]
async fn post_emits_batch_events_and_status() {
    let transport = Arc::new(common::FakeTransport::scripted(vec![
        BatchOutcome::Success { message: "ok".into() },
        BatchOutcome::ServerError { status: 502, message: "bad gateway".into() },
    ]));
    let (registry, _dir) = registry_with(transport).await;
    common::seed_snaps(&registry.store, 15);
    set_mail_to(&registry, "ops@example.com").await;

    let mut rx = registry.event_bus.subscribe();
    registry.sync.post_all().await.unwrap();

    let mut batches = Vec::new();
    loop {
        match rx.recv().await.unwrap() {
            AppEvent::BatchPosted { index, size, success } => batches.push((index, size, success)),
            AppEvent::SyncFinished { posted, failed, message } => {
                assert_eq!((posted, failed), (1, 1));
                assert_eq!(message, status::PARTIAL_POST);
            }
            AppEvent::Status { message } => {
                assert_eq!(message, status::PARTIAL_POST);
                break;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(batches, vec![(0, 10, true), (1, 5, false)]);
}

// ---- Transport failures and concurrency ----

struct BrokenTransport;

#[async_trait]
impl BatchTransport for BrokenTransport {
    async fn post_batch(&self, _mail_to: &str, _batch: &[SnapPayload]) -> MsResult<BatchOutcome> {
        Err(MsError::Network("connection reset".into()))
    }
}

#[tokio::test]
async fn transport_error_counts_as_failed_batch() {
    let (registry, _dir) =
        common::open_registry_with(Arc::new(BrokenTransport), Arc::new(PassthroughEncoder)).await;
    common::seed_snaps(&registry.store, 3);
    set_mail_to(&registry, "ops@example.com").await;

    let report = report_of(registry.sync.post_all().await.unwrap());
    assert_eq!((report.posted, report.failed), (0, 1));
    assert!(report.message.contains("connection reset"));
}

/// Transport that holds the first batch until released.
struct GatedTransport {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl BatchTransport for GatedTransport {
    async fn post_batch(&self, _mail_to: &str, batch: &[SnapPayload]) -> MsResult<BatchOutcome> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(BatchOutcome::Success { message: format!("{} sent", batch.len()) })
    }
}

#[tokio::test]
async fn second_post_while_running_is_refused() {
    let transport = Arc::new(GatedTransport {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let (registry, _dir) =
        common::open_registry_with(transport.clone(), Arc::new(PassthroughEncoder)).await;
    common::seed_snaps(&registry.store, 4);
    set_mail_to(&registry, "ops@example.com").await;

    let sync = registry.sync.clone();
    let running = tokio::spawn(async move { sync.post_all().await });

    transport.entered.notified().await;
    let refused = registry.sync.post_all().await.unwrap();
    assert_eq!(refused, SyncOutcome::AlreadyRunning);

    transport.release.notify_one();
    let finished = running.await.unwrap().unwrap();
    assert_eq!(finished.message(), "4 sent");

    // Released once the first post is done.
    transport.release.notify_one();
    let again = registry.sync.post_all().await.unwrap();
    assert!(matches!(again, SyncOutcome::Completed(_)));
}
