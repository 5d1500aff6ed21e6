//! Backend trait for primitive persistence
//!
//! Implementations are in infra/storage.

use crate::contract::{BackendError, Snapshot};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Live sequence of full-store snapshots
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, BackendError>>;

/// In-place edit applied atomically to the persisted snapshot
pub type Transform = Box<dyn FnOnce(&mut Snapshot) + Send>;

/// Asynchronous, string-keyed store of primitive values
#[async_trait]
pub trait PreferencesBackend: Send + Sync {
    /// Observe the store.
    ///
    /// The stream yields the current snapshot first and then a new one after
    /// every change. It never ends on its own.
    fn observe(&self) -> SnapshotStream;

    /// Atomically apply `transform` to the persisted snapshot.
    ///
    /// Concurrent calls are serialized; each sees the result of the previous
    /// one. Returns the snapshot that was persisted.
    async fn mutate(&self, transform: Transform) -> Result<Snapshot, BackendError>;
}
