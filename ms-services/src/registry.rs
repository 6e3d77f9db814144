//! Service registry for dependency injection and lifecycle management.
//!
//! The registry opens the shared infrastructure (record store, event bus,
//! config mirror, application log), builds every service with handles to
//! it, initializes them in order, and handles ordered shutdown.

use std::sync::Arc;
use tracing::{info, error};

use ms_api::{ApiClient, BatchTransport};
use ms_core::config::ConfigHandle;
use ms_core::error::{MsError, MsResult};
use ms_models::{Database, RecordStore};

use crate::applog::AppLogger;
use crate::config::{ConfigMirror, ConfigResolver};
use crate::encoder::{MetadataEncoder, PassthroughEncoder};
use crate::event_bus::EventBus;
use crate::reconcile::Reconciler;
use crate::service::{Service, ServiceState};
use crate::snaps::SnapService;
use crate::sync::SyncBatcher;

/// Central service registry that manages all application services.
pub struct ServiceRegistry {
    /// Process configuration.
    pub config: ConfigHandle,
    /// Database connection pool.
    pub database: Database,
    /// Keyed record store over the database.
    pub store: RecordStore,
    /// Application-level event bus.
    pub event_bus: EventBus,
    /// In-memory copy of the hot settings.
    pub mirror: ConfigMirror,
    /// Persistent application log.
    pub logger: AppLogger,
    pub resolver: Arc<ConfigResolver>,
    pub snaps: Arc<SnapService>,
    pub reconciler: Arc<Reconciler>,
    pub sync: Arc<SyncBatcher>,
    /// Registered services in initialization order.
    services: Vec<Arc<dyn Service>>,
}

impl ServiceRegistry {
    /// Open the registry with the HTTP transport and the default encoder.
    pub async fn open(database: Database, config: ConfigHandle) -> MsResult<Self> {
        let server = config.read().await.server.clone();
        let client = ApiClient::new(&server)?;
        Self::open_with(database, config, Arc::new(client), Arc::new(PassthroughEncoder)).await
    }

    /// Open the registry with explicit transport and encoder.
    ///
    /// Resolves the stored settings once to prime the config mirror before
    /// any service can read it.
    pub async fn open_with(
        database: Database,
        config: ConfigHandle,
        transport: Arc<dyn BatchTransport>,
        encoder: Arc<dyn MetadataEncoder>,
    ) -> MsResult<Self> {
        let store = RecordStore::new(database.clone());
        let event_bus = EventBus::new(256);
        let mirror = ConfigMirror::new();
        let logger = AppLogger::new(store.clone(), mirror.clone());

        let resolver = Arc::new(ConfigResolver::new(
            store.clone(),
            mirror.clone(),
            logger.clone(),
            event_bus.clone(),
        ));
        resolver.load_and_prime().await?;

        let snaps = Arc::new(SnapService::new(
            store.clone(),
            mirror.clone(),
            Arc::clone(&encoder),
            logger.clone(),
            event_bus.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            encoder,
            logger.clone(),
            event_bus.clone(),
        ));
        let sync = Arc::new(SyncBatcher::new(
            store.clone(),
            Arc::clone(&resolver),
            transport,
            logger.clone(),
            event_bus.clone(),
        ));

        let services: Vec<Arc<dyn Service>> = vec![
            resolver.clone(),
            snaps.clone(),
            reconciler.clone(),
            sync.clone(),
        ];
        for service in &services {
            info!("registered service: {}", service.name());
        }

        Ok(Self {
            config,
            database,
            store,
            event_bus,
            mirror,
            logger,
            resolver,
            snaps,
            reconciler,
            sync,
            services,
        })
    }

    /// Initialize all registered services in order.
    pub fn init_all(&self) -> MsResult<()> {
        info!("initializing {} services", self.services.len());

        for service in &self.services {
            let name = service.name();
            if let Err(e) = service.init() {
                error!("failed to initialize service {name}: {e}");
                return Err(MsError::ServiceInit(format!("{name}: {e}")));
            }
        }

        info!("all services initialized");
        Ok(())
    }

    /// Shut down all services in reverse order.
    pub fn shutdown_all(&self) -> MsResult<()> {
        info!("shutting down services");

        for service in self.services.iter().rev() {
            if let Err(e) = service.shutdown() {
                error!("error shutting down service {}: {e}", service.name());
                // Continue shutting down other services
            }
        }

        info!("all services shut down");
        Ok(())
    }

    /// Get the health status of all services.
    pub fn health_check(&self) -> Vec<(String, ServiceState, bool)> {
        self.services
            .iter()
            .map(|s| (s.name().to_string(), s.state(), s.is_healthy()))
            .collect()
    }

    /// Get the number of registered services.
    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}
