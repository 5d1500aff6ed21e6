//! Typed Settings
//!
//! Typed keys, defaults and converters over an asynchronous key-value store.
//! Keys describe a slot and how its primitive maps to a logical value; the
//! [`SettingsStore`] turns them into observable reads and ordered writes.

// Public exports
pub mod contract;
pub use contract::{
    converter, keys, BackendError, ConversionError, Converter, DefaultKey, Descriptor, Key,
    KeyId, Primitive, PrimitiveKind, PrimitiveValue, SettingsError, Snapshot,
};

pub mod config;
pub use config::Config;

pub mod domain;
pub use domain::{
    Batch, PendingWrite, PreferencesBackend, SettingStream, SettingsStore, SharedSetting,
    SharingPolicy, Subscription,
};

pub mod global;

pub mod infra;
pub use infra::storage::{InMemoryBackend, JsonFileBackend};

mod module;
