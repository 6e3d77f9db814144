//! MetaSnap Services - Business logic and service layer.
//!
//! This crate provides the service trait, the service registry, and the
//! concrete services covering:
//! - Snap capture, listing, and deletion
//! - Page windows over the snap list
//! - Edit capture and background reconciliation
//! - User settings resolution with an in-memory mirror
//! - Batched posting of snaps to the sync endpoint
//! - The persistent application log
//! - Event bus (typed intra-service communication)

pub mod service;
pub mod registry;
pub mod event_bus;
pub mod affordance;
pub mod applog;
pub mod config;
pub mod encoder;
pub mod pagination;
pub mod snaps;
pub mod reconcile;
pub mod sync;

// Re-export key types
pub use service::{Service, ServiceState};
pub use registry::ServiceRegistry;
pub use event_bus::{AppEvent, EventBus};
pub use affordance::{Affordance, AffordanceGuard};
pub use applog::AppLogger;
pub use config::{ConfigMirror, ConfigResolver, ResolvedConfig};
pub use encoder::{EncodeRequest, MetadataEncoder, PassthroughEncoder};
pub use pagination::{PageRange, PageWindow};
pub use snaps::{EditableSnap, SaveOutcome, SnapDraft, SnapPage, SnapService};
pub use reconcile::{EditCapture, ReconcileReport, Reconciler, SnapEdit, Snapshot};
pub use sync::{partition, SyncBatcher, SyncOutcome, SyncReport};
