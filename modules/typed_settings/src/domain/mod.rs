//! Domain layer - settings store, write queue and shared values

pub mod backend;
pub mod queue;
pub mod shared;
pub mod store;

pub use backend::{PreferencesBackend, SnapshotStream, Transform};
pub use queue::PendingWrite;
pub use shared::{SettingStream, SharedSetting, SharingPolicy, Subscription};
pub use store::{Batch, SettingsStore};
