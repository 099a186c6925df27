//! crates/hearth_core/src/ports.rs
//!
//! Defines the contracts the store's host must fulfil.
//! The reducer never performs I/O; loading and saving snapshots and fetching
//! the remote household view happen behind these traits so the core stays
//! independent of files, HTTP clients and runtimes.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Snapshot;
use crate::reconcile::RemoteHouse;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., filesystem, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage for the persisted envelope.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns the raw envelope, or `None` on first run.
    ///
    /// The value is deliberately untyped: it goes through the normalizer,
    /// which tolerates older or damaged snapshots.
    async fn load(&self) -> PortResult<Option<Value>>;

    async fn save(&self, snapshot: &Snapshot) -> PortResult<()>;
}

/// The remote household service.
#[async_trait]
pub trait RemoteHouseSource: Send + Sync {
    /// Fetches every house the identity behind `room_key` belongs to.
    async fn fetch_houses(&self, room_key: &str) -> PortResult<Vec<RemoteHouse>>;
}
