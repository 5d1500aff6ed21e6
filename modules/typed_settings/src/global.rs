//! Optional process-wide default store
//!
//! Prefer passing an `Arc<SettingsStore>` explicitly. This exists for code
//! that cannot be handed one; it is set exactly once by the composition root.

use crate::contract::SettingsError;
use crate::domain::SettingsStore;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static DEFAULT_STORE: OnceCell<Arc<SettingsStore>> = OnceCell::new();

/// Install the process-wide store. Fails if one is already installed.
pub fn init(store: Arc<SettingsStore>) -> Result<(), SettingsError> {
    DEFAULT_STORE
        .set(store)
        .map_err(|_| SettingsError::AlreadyInitialized)?;
    tracing::info!("Process-wide settings store installed");
    Ok(())
}

/// The process-wide store installed by [`init`]
pub fn get() -> Result<Arc<SettingsStore>, SettingsError> {
    DEFAULT_STORE
        .get()
        .cloned()
        .ok_or(SettingsError::NotInitialized)
}

pub fn is_initialized() -> bool {
    DEFAULT_STORE.get().is_some()
}
