//! MetaSnap API - HTTP client for the snap sync endpoint.
//!
//! This crate posts batches of snaps to the configured endpoint and
//! classifies each attempt as delivered, rejected by the server, or
//! unreachable. The `BatchTransport` trait is the seam the sync batcher
//! talks to, so alternative transports can stand in for the HTTP client.

pub mod client;
pub mod transport;

// Re-export key types
pub use client::ApiClient;
pub use transport::{BatchOutcome, BatchTransport};
