//! Posting snaps to the sync endpoint in batches.
//!
//! All stored snaps are split into batches of the configured size and
//! posted one batch at a time. A failed batch is logged and the rest are
//! still attempted; the final status summarises the whole run.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use ms_api::{BatchOutcome, BatchTransport};
use ms_core::constants::status;
use ms_core::error::MsResult;
use ms_models::{RecordStore, Snap, SnapPayload};

use crate::affordance::Affordance;
use crate::applog::AppLogger;
use crate::config::ConfigResolver;
use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState, StateCell};

/// Split records into ordered batches of at most `batch_size`.
pub fn partition<T>(records: &[T], batch_size: usize) -> Vec<&[T]> {
    records.chunks(batch_size.max(1)).collect()
}

/// Totals for a completed post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub batches: usize,
    pub posted: usize,
    pub failed: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// There were no snaps.
    NothingToPost,
    /// No destination address is configured.
    MissingAddress,
    /// Another post is still running.
    AlreadyRunning,
    Completed(SyncReport),
}

impl SyncOutcome {
    /// Status text for the user.
    pub fn message(&self) -> &str {
        match self {
            SyncOutcome::NothingToPost => status::NOTHING_TO_POST,
            SyncOutcome::MissingAddress => status::MISSING_ADDRESS,
            SyncOutcome::AlreadyRunning => status::POST_IN_PROGRESS,
            SyncOutcome::Completed(report) => &report.message,
        }
    }
}

pub struct SyncBatcher {
    state: StateCell,
    store: RecordStore,
    resolver: Arc<ConfigResolver>,
    transport: Arc<dyn BatchTransport>,
    logger: AppLogger,
    event_bus: EventBus,
    post_affordance: Affordance,
}

impl SyncBatcher {
    pub fn new(
        store: RecordStore,
        resolver: Arc<ConfigResolver>,
        transport: Arc<dyn BatchTransport>,
        logger: AppLogger,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: StateCell::new(),
            store,
            resolver,
            transport,
            logger,
            event_bus,
            post_affordance: Affordance::new("post snaps"),
        }
    }

    /// Post every stored snap.
    pub async fn post_all(&self) -> MsResult<SyncOutcome> {
        let Some(_guard) = self.post_affordance.suspend() else {
            return Ok(self.finish(SyncOutcome::AlreadyRunning));
        };

        let count = match self.store.count::<Snap>() {
            Ok(count) => count,
            Err(e) => {
                self.logger
                    .escalate(format!("Error when attempting to count snaps: {e}"))
                    .await;
                return Err(e);
            }
        };
        if count == 0 {
            return Ok(self.finish(SyncOutcome::NothingToPost));
        }

        let config = match self.resolver.load() {
            Ok(config) => config,
            Err(e) => {
                self.logger
                    .escalate(format!("Error when attempting to read config: {e}"))
                    .await;
                return Err(e);
            }
        };
        if !config.has_address() {
            return Ok(self.finish(SyncOutcome::MissingAddress));
        }

        let payloads: Vec<SnapPayload> = match self.store.load_all::<Snap>() {
            Ok(snaps) => snaps.iter().map(Snap::to_payload).collect(),
            Err(e) => {
                self.logger
                    .escalate(format!("Error when attempting to read snaps: {e}"))
                    .await;
                return Err(e);
            }
        };

        let batches = partition(&payloads, config.batch_size as usize);
        info!(
            "posting {} snap(s) in {} batch(es) of up to {}",
            payloads.len(),
            batches.len(),
            config.batch_size
        );

        let mut report = SyncReport {
            batches: batches.len(),
            ..SyncReport::default()
        };
        let mut last_success = None;
        let mut last_failure = None;

        for (index, batch) in batches.iter().enumerate() {
            let success = match self.transport.post_batch(&config.mail_to, batch).await {
                Ok(BatchOutcome::Success { message }) => {
                    self.logger
                        .debug(format!(
                            "Batch {} of {} posted: {message}",
                            index + 1,
                            batches.len()
                        ))
                        .await;
                    last_success = Some(message);
                    true
                }
                Ok(BatchOutcome::ServerError { status, message }) => {
                    warn!("batch {} rejected with status {status}", index + 1);
                    self.logger.error(message.clone()).await;
                    last_failure = Some(message);
                    false
                }
                Ok(BatchOutcome::Unreachable { message }) => {
                    self.logger.info(message.clone()).await;
                    last_failure = Some(message);
                    false
                }
                Err(e) => {
                    let message = format!("Batch {} could not be sent: {e}", index + 1);
                    self.logger.error(message.clone()).await;
                    last_failure = Some(message);
                    false
                }
            };

            if success {
                report.posted += 1;
            } else {
                report.failed += 1;
            }
            self.event_bus.emit(AppEvent::BatchPosted {
                index,
                size: batch.len(),
                success,
            });
        }

        report.message = match (report.posted, report.failed) {
            (posted, failed) if posted > 0 && failed > 0 => status::PARTIAL_POST.to_string(),
            (_, 0) => last_success.unwrap_or_default(),
            _ => last_failure.unwrap_or_default(),
        };

        self.event_bus.emit(AppEvent::SyncFinished {
            posted: report.posted,
            failed: report.failed,
            message: report.message.clone(),
        });
        Ok(self.finish(SyncOutcome::Completed(report)))
    }

    fn finish(&self, outcome: SyncOutcome) -> SyncOutcome {
        info!("post finished: {}", outcome.message());
        self.event_bus.status(outcome.message());
        outcome
    }
}

impl Service for SyncBatcher {
    fn name(&self) -> &str {
        "sync"
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

    #[test]
    fn test_partition_sizes() {
        let records: Vec<u32> = (0..23).collect();
        let sizes: Vec<usize> = partition(&records, 10).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
    }

    #[test]
    fn test_partition_preserves_order_for_all_sizes() {
        for n in [0usize, 1, 9, 10, 11, 57, 100, 101] {
            let records: Vec<usize> = (0..n).collect();
            for batch_size in [1usize, 2, 7, 10, 33, 100] {
                let batches = partition(&records, batch_size);
                assert_eq!(batches.len(), n.div_ceil(batch_size));
                for (i, batch) in batches.iter().enumerate() {
                    if i + 1 < batches.len() {
                        assert_eq!(batch.len(), batch_size);
                    } else {
                        assert!(batch.len() <= batch_size && !batch.is_empty());
                    }
                }
                let rejoined: Vec<usize> = batches.concat();
                assert_eq!(rejoined, records);
            }
        }
    }

    #[test]
    fn test_partition_zero_size_treated_as_one() {
        let records = [1, 2, 3];
        assert_eq!(partition(&records, 0).len(), 3);
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(SyncOutcome::NothingToPost.message(), status::NOTHING_TO_POST);
        let report = SyncReport { message: "sent".into(), ..SyncReport::default() };
        assert_eq!(SyncOutcome::Completed(report).message(), "sent");
    }
}
