//! In-memory backend

use crate::contract::{BackendError, Snapshot};
use crate::domain::backend::{PreferencesBackend, SnapshotStream, Transform};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

type Observation = Result<Snapshot, BackendError>;

/// Process-local backend holding the snapshot in memory.
///
/// Nothing survives the process. Besides serving as the default backend it
/// can inject failures, which makes it the backend of choice in tests.
pub struct InMemoryBackend {
    observed: watch::Sender<Observation>,
    current: Mutex<Snapshot>,
    write_failure: Mutex<Option<BackendError>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::default())
    }

    /// Start from pre-populated contents
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let (observed, _) = watch::channel(Ok(snapshot.clone()));
        Self {
            observed,
            current: Mutex::new(snapshot),
            write_failure: Mutex::new(None),
        }
    }

    /// Current contents, regardless of any injected read failure
    pub fn snapshot(&self) -> Snapshot {
        self.current.lock().clone()
    }

    /// Publish `error` to every observer in place of a snapshot.
    ///
    /// The next successful mutation publishes a snapshot again.
    pub fn fail_reads(&self, error: BackendError) {
        self.observed.send_modify(|observed| *observed = Err(error));
    }

    /// Make every following mutation fail with `error`; `None` heals
    pub fn fail_writes(&self, error: Option<BackendError>) {
        *self.write_failure.lock() = error;
    }

    /// Number of live observers
    pub fn observer_count(&self) -> usize {
        self.observed.receiver_count()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferencesBackend for InMemoryBackend {
    fn observe(&self) -> SnapshotStream {
        WatchStream::new(self.observed.subscribe()).boxed()
    }

    async fn mutate(&self, transform: Transform) -> Result<Snapshot, BackendError> {
        if let Some(error) = self.write_failure.lock().clone() {
            return Err(error);
        }

        // Publishing under the lock keeps emissions in mutation order
        let mut current = self.current.lock();
        let mut next = current.clone();
        transform(&mut next);
        *current = next.clone();
        self.observed.send_modify(|observed| *observed = Ok(next.clone()));

        Ok(next)
    }
}
