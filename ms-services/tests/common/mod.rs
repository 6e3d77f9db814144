//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use ms_api::{BatchOutcome, BatchTransport};
use ms_core::config::{AppConfig, ConfigHandle, DatabaseConfig};
use ms_core::error::{MsError, MsResult};
use ms_models::{Database, Location, RecordStore, Snap, SnapPayload};
use ms_services::encoder::{EncodeRequest, MetadataEncoder, PassthroughEncoder};
use ms_services::registry::ServiceRegistry;

/// Create a temporary database with full schema and migrations applied.
/// Returns the Database and the TempDir (must be held alive for the duration of the test).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let config = DatabaseConfig::default();
    let db = Database::init(&path, &config).expect("failed to init test database");
    (db, dir)
}

/// Create a ConfigHandle wrapping a default config.
pub fn create_test_config_handle() -> ConfigHandle {
    ConfigHandle::new(AppConfig::default())
}

/// Open a registry over a fresh database with the given transport and encoder.
pub async fn open_registry_with(
    transport: Arc<dyn BatchTransport>,
    encoder: Arc<dyn MetadataEncoder>,
) -> (ServiceRegistry, TempDir) {
    let (db, dir) = create_test_db();
    let registry = ServiceRegistry::open_with(db, create_test_config_handle(), transport, encoder)
        .await
        .expect("failed to open registry");
    registry.init_all().expect("failed to init services");
    (registry, dir)
}

/// Open a registry with a transport that accepts every batch.
pub async fn open_registry() -> (ServiceRegistry, TempDir) {
    open_registry_with(Arc::new(FakeTransport::accepting()), Arc::new(PassthroughEncoder)).await
}

/// Insert `count` snaps titled `snap 1`..`snap N`, returning their ids in order.
pub fn seed_snaps(store: &RecordStore, count: usize) -> Vec<i64> {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    (1..=count)
        .map(|i| {
            let location = if i % 2 == 0 {
                Location::Known { latitude: 51.5, longitude: -1.5 }
            } else {
                Location::Unknown
            };
            let snap = Snap::new(
                format!("snap {i}"),
                format!("note {i}"),
                if i % 3 == 0 { "data:image/jpeg;base64,/9j/4AAQ" } else { "" },
                location,
                base + Duration::minutes(i as i64),
            );
            store.add(&snap).expect("failed to seed snap")
        })
        .collect()
}

/// One recorded call to the fake transport.
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub mail_to: String,
    pub batch: Vec<SnapPayload>,
}

/// Transport that replays scripted outcomes and records every call.
///
/// Once the script runs out every batch succeeds.
pub struct FakeTransport {
    script: Mutex<VecDeque<BatchOutcome>>,
    calls: Mutex<Vec<RecordedPost>>,
}

impl FakeTransport {
    pub fn accepting() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn scripted(outcomes: Vec<BatchOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedPost> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls().iter().map(|c| c.batch.len()).collect()
    }
}

#[async_trait]
impl BatchTransport for FakeTransport {
    async fn post_batch(&self, mail_to: &str, batch: &[SnapPayload]) -> MsResult<BatchOutcome> {
        self.calls.lock().unwrap().push(RecordedPost {
            mail_to: mail_to.to_string(),
            batch: batch.to_vec(),
        });
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| BatchOutcome::Success {
            message: format!("{} snaps sent", batch.len()),
        }))
    }
}

/// Encoder that counts calls and returns the payload unchanged.
#[derive(Default)]
pub struct CountingEncoder {
    calls: AtomicUsize,
}

impl CountingEncoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetadataEncoder for CountingEncoder {
    fn encode(&self, request: &EncodeRequest<'_>) -> MsResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(request.payload.to_string())
    }
}

/// Encoder that always fails.
pub struct FailingEncoder;

impl MetadataEncoder for FailingEncoder {
    fn encode(&self, _request: &EncodeRequest<'_>) -> MsResult<String> {
        Err(MsError::Encoding("not a JPEG".into()))
    }
}
