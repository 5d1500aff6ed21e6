//! Store construction from configuration

use crate::config::Config;
use crate::contract::SettingsError;
use crate::domain::{PreferencesBackend, SettingsStore};
use crate::infra::storage::{InMemoryBackend, JsonFileBackend};
use std::sync::Arc;

impl SettingsStore {
    /// Build the backend described by `config` and a store over it.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn open(config: &Config) -> Result<Self, SettingsError> {
        let backend: Arc<dyn PreferencesBackend> = match &config.file_path {
            Some(path) => Arc::new(JsonFileBackend::open(path.clone(), config.pretty).await?),
            None => Arc::new(InMemoryBackend::new()),
        };

        tracing::info!(
            file = ?config.file_path,
            grace_period = ?config.grace_period,
            "Settings store initialized"
        );
        Ok(Self::new(backend))
    }
}
