//! Settings store - typed access to a primitive backend

use super::backend::PreferencesBackend;
use super::queue::{PendingWrite, WriteQueue};
use super::shared::{SettingStream, SharedSetting, SharingPolicy};
use crate::contract::{BackendError, Descriptor, PrimitiveValue, SettingsError, Snapshot};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Typed view over a [`PreferencesBackend`].
///
/// Reads are streams re-projected for every backend snapshot. Writes are
/// queued and applied in submission order by a background worker; the
/// returned [`PendingWrite`] may be awaited or dropped.
///
/// ```rust,ignore
/// let store = SettingsStore::new(Arc::new(InMemoryBackend::new()));
/// let counter = int_key_or("counter", 0);
///
/// store.set(&counter, 5).await?;
/// assert_eq!(store.read(&counter).await?, 5);
/// ```
pub struct SettingsStore {
    backend: Arc<dyn PreferencesBackend>,
    writes: WriteQueue,
}

impl SettingsStore {
    /// Create a store over `backend`.
    ///
    /// Spawns the write worker, so this must be called within a Tokio runtime.
    pub fn new(backend: Arc<dyn PreferencesBackend>) -> Self {
        let writes = WriteQueue::spawn(Arc::clone(&backend));
        Self { backend, writes }
    }

    pub fn backend(&self) -> &Arc<dyn PreferencesBackend> {
        &self.backend
    }

    // ===== Reads =====

    /// Observe `key`.
    ///
    /// The first item reflects the current state; later items follow every
    /// backend change. A value that cannot be decoded yields an `Err` item and
    /// the stream carries on with the next snapshot. A non-transient backend
    /// failure is yielded once and ends the stream.
    pub fn get<D: Descriptor>(&self, key: &D) -> SettingStream<D::Output> {
        project(self.backend.as_ref(), key.clone())
    }

    /// Current value of `key` (the first item of [`SettingsStore::get`])
    pub async fn read<D: Descriptor>(&self, key: &D) -> Result<D::Output, SettingsError> {
        self.get(key)
            .next()
            .await
            .unwrap_or(Err(SettingsError::Backend(BackendError::Closed)))
    }

    /// Whether anything is stored under the key's name.
    ///
    /// Blocks the calling thread until the backend delivers its first
    /// snapshot. Do not call this from a context that must not block, such as
    /// a single-threaded async executor.
    pub fn contains<D: Descriptor>(&self, key: &D) -> Result<bool, SettingsError> {
        let first = futures::executor::block_on(snapshots(self.backend.as_ref()).next());
        match first {
            Some(snapshot) => Ok(snapshot?.contains(key.name())),
            None => Err(SettingsError::Backend(BackendError::Closed)),
        }
    }

    /// Turn `get(key)` into a hot cached value governed by `policy`.
    ///
    /// `initial` is served until the first value arrives.
    pub fn materialize<D: Descriptor>(
        &self,
        key: &D,
        policy: SharingPolicy,
        initial: D::Output,
    ) -> SharedSetting<D::Output> {
        let backend = Arc::clone(&self.backend);
        let key = key.clone();
        SharedSetting::new(key.name().to_string(), policy, initial, move || {
            project(backend.as_ref(), key.clone())
        })
    }

    // ===== Writes =====

    /// Store `value` under `key`
    pub fn set<D: Descriptor>(&self, key: &D, value: D::Value) -> PendingWrite {
        let name = key.name().to_string();
        let primitive = key.encode(&value);
        tracing::debug!(key = %name, kind = %key.kind(), "queueing settings write");

        self.writes.submit(
            name.clone(),
            Box::new(move |snapshot: &mut Snapshot| {
                snapshot.insert(name, primitive);
            }),
        )
    }

    /// Delete whatever is stored under `key`; a no-op if nothing is
    pub fn remove<D: Descriptor>(&self, key: &D) -> PendingWrite {
        let name = key.name().to_string();
        tracing::debug!(key = %name, "queueing settings removal");

        self.writes.submit(
            name.clone(),
            Box::new(move |snapshot: &mut Snapshot| {
                snapshot.remove(&name);
            }),
        )
    }

    /// Apply several writes as a single atomic mutation
    pub fn edit<F>(&self, build: F) -> PendingWrite
    where
        F: FnOnce(&mut Batch),
    {
        let mut batch = Batch::default();
        build(&mut batch);
        let label = batch.label();
        tracing::debug!(batch = %label, ops = batch.len(), "queueing settings batch");

        self.writes
            .submit(label, Box::new(move |snapshot: &mut Snapshot| batch.apply(snapshot)))
    }

    /// Delete every stored value
    pub fn clear(&self) -> PendingWrite {
        tracing::debug!("queueing settings clear");
        self.writes
            .submit("*", Box::new(|snapshot: &mut Snapshot| snapshot.clear()))
    }
}

enum BatchOp {
    Set(String, PrimitiveValue),
    Remove(String),
    Clear,
}

/// Writes collected by [`SettingsStore::edit`], applied in insertion order
#[derive(Default)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    pub fn set<D: Descriptor>(&mut self, key: &D, value: D::Value) -> &mut Self {
        self.ops
            .push(BatchOp::Set(key.name().to_string(), key.encode(&value)));
        self
    }

    pub fn remove<D: Descriptor>(&mut self, key: &D) -> &mut Self {
        self.ops.push(BatchOp::Remove(key.name().to_string()));
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.ops.push(BatchOp::Clear);
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn label(&self) -> String {
        let names: Vec<&str> = self
            .ops
            .iter()
            .map(|op| match op {
                BatchOp::Set(name, _) | BatchOp::Remove(name) => name.as_str(),
                BatchOp::Clear => "*",
            })
            .collect();
        format!("[{}]", names.join(", "))
    }

    fn apply(self, snapshot: &mut Snapshot) {
        for op in self.ops {
            match op {
                BatchOp::Set(name, value) => {
                    snapshot.insert(name, value);
                }
                BatchOp::Remove(name) => {
                    snapshot.remove(&name);
                }
                BatchOp::Clear => snapshot.clear(),
            }
        }
    }
}

/// Backend snapshots with transient failures replaced by an empty snapshot.
///
/// Ends right after yielding a non-transient failure.
fn snapshots(backend: &dyn PreferencesBackend) -> BoxStream<'static, Result<Snapshot, SettingsError>> {
    stream::unfold(Some(backend.observe()), |upstream| async move {
        let mut upstream = upstream?;
        match upstream.next().await? {
            Ok(snapshot) => Some((Ok(snapshot), Some(upstream))),
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "settings backend read failed, serving empty snapshot");
                Some((Ok(Snapshot::default()), Some(upstream)))
            }
            Err(e) => {
                tracing::error!(error = %e, "settings backend failed");
                Some((Err(SettingsError::Backend(e)), None))
            }
        }
    })
    .boxed()
}

fn project<D: Descriptor>(backend: &dyn PreferencesBackend, key: D) -> SettingStream<D::Output> {
    snapshots(backend)
        .map(move |snapshot| snapshot.and_then(|snapshot| key.project(&snapshot)))
        .boxed()
}
