//! JSON file backend

use crate::contract::{BackendError, PrimitiveValue, Snapshot};
use crate::domain::backend::{PreferencesBackend, SnapshotStream, Transform};
use async_trait::async_trait;
use futures::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;

type Observation = Result<Snapshot, BackendError>;

/// Backend persisting the whole snapshot as one JSON document.
///
/// Every mutation rewrites the file through a temporary sibling that is then
/// renamed over the target, so readers of the file never see a partial write.
pub struct JsonFileBackend {
    path: PathBuf,
    pretty: bool,
    observed: watch::Sender<Observation>,
    write_lock: Mutex<()>,
}

impl JsonFileBackend {
    /// Open (or lazily create) the settings file at `path`.
    ///
    /// A missing file is an empty store. A file that cannot be read or parsed
    /// is reported to observers as a transient failure; it is only replaced
    /// once a later mutation manages to load it.
    pub async fn open(path: impl Into<PathBuf>, pretty: bool) -> Result<Self, BackendError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = load(&path).await;
        match &initial {
            Ok(snapshot) => {
                tracing::info!(path = %path.display(), entries = snapshot.len(), "opened settings file");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "settings file is unreadable");
            }
        }

        let (observed, _) = watch::channel(initial);
        Ok(Self {
            path,
            pretty,
            observed,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), BackendError> {
        // JSON has no NaN or infinity; serde_json would quietly write `null`
        if let Some((name, value)) = snapshot.iter().find(|(_, value)| !is_finite(value)) {
            return Err(BackendError::Serialization(format!(
                "{name}: {value:?} has no JSON representation"
            )));
        }

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(snapshot)
        } else {
            serde_json::to_vec(snapshot)
        }
        .map_err(|e| BackendError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn is_finite(value: &PrimitiveValue) -> bool {
    match value {
        PrimitiveValue::Float(v) => v.is_finite(),
        PrimitiveValue::Double(v) => v.is_finite(),
        _ => true,
    }
}

async fn load(path: &Path) -> Result<Snapshot, BackendError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Snapshot::default()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| BackendError::Corrupt(e.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::default()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl PreferencesBackend for JsonFileBackend {
    fn observe(&self) -> SnapshotStream {
        WatchStream::new(self.observed.subscribe()).boxed()
    }

    async fn mutate(&self, transform: Transform) -> Result<Snapshot, BackendError> {
        let _guard = self.write_lock.lock().await;

        let published = self.observed.borrow().clone();
        let mut snapshot = match published {
            Ok(snapshot) => snapshot,
            // Never build on top of state we failed to read
            Err(_) => load(&self.path).await?,
        };

        transform(&mut snapshot);
        self.persist(&snapshot).await?;
        self.observed.send_modify(|observed| *observed = Ok(snapshot.clone()));

        tracing::debug!(path = %self.path.display(), entries = snapshot.len(), "settings file written");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::open(dir.path().join("nested/settings.json"), true)
            .await
            .unwrap();

        let first = backend.observe().next().await.unwrap().unwrap();
        assert!(first.is_empty());
        assert!(!backend.path().exists());
    }

    #[tokio::test]
    async fn test_mutation_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let backend = JsonFileBackend::open(&path, false).await.unwrap();

        backend
            .mutate(Box::new(|s: &mut Snapshot| {
                s.insert("counter", PrimitiveValue::Int(5));
            }))
            .await
            .unwrap();

        let written: Snapshot = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written.get("counter"), Some(&PrimitiveValue::Int(5)));
        assert!(!backend.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_transient_and_blocks_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let backend = JsonFileBackend::open(&path, true).await.unwrap();
        let observed = backend.observe().next().await.unwrap();
        assert!(matches!(observed, Err(ref e) if e.is_transient()));

        let result = backend.mutate(Box::new(|s: &mut Snapshot| s.clear())).await;
        assert!(matches!(result, Err(BackendError::Corrupt(_))));
        assert_eq!(std::fs::read(&path).unwrap(), b"{ not json");
    }

    #[tokio::test]
    async fn test_non_finite_float_is_rejected_and_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let backend = JsonFileBackend::open(&path, false).await.unwrap();

        backend
            .mutate(Box::new(|s: &mut Snapshot| {
                s.insert("counter", PrimitiveValue::Int(5));
            }))
            .await
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        for value in [
            PrimitiveValue::Double(f64::NAN),
            PrimitiveValue::Double(f64::NEG_INFINITY),
            PrimitiveValue::Float(f32::INFINITY),
        ] {
            let result = backend
                .mutate(Box::new(move |s: &mut Snapshot| {
                    s.insert("ratio", value);
                }))
                .await;
            assert!(matches!(result, Err(BackendError::Serialization(_))));
        }

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(!backend.temp_path().exists());
        let observed = backend.observe().next().await.unwrap().unwrap();
        assert_eq!(observed.get("ratio"), None);
        assert_eq!(observed.get("counter"), Some(&PrimitiveValue::Int(5)));
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let backend = JsonFileBackend::open(&path, false).await.unwrap();

        // A non-empty directory in place of the file makes the rename fail
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"").unwrap();

        let result = backend
            .mutate(Box::new(|s: &mut Snapshot| {
                s.insert("counter", PrimitiveValue::Int(1));
            }))
            .await;
        assert!(matches!(result, Err(BackendError::Io(_))));
        assert!(!backend.temp_path().exists());
    }
}
