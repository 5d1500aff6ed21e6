//! Contract error types for typed settings
//!
//! All errors are `Clone` so a single failure can be fanned out to every
//! subscriber of a shared setting.

use super::model::PrimitiveKind;
use std::sync::Arc;
use thiserror::Error;

/// Raised by [`Converter::decode`](super::converter::Converter::decode) for a
/// primitive it does not recognize
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error for a primitive outside the converter's accepted range
    pub fn unrecognized(value: impl std::fmt::Debug) -> Self {
        Self::new(format!("unrecognized value {:?}", value))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failures reported by a [`PreferencesBackend`](crate::domain::PreferencesBackend)
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Reading or writing the underlying medium failed
    #[error("backend I/O failed: {0}")]
    Io(Arc<std::io::Error>),
    /// Persisted data could not be parsed
    #[error("backend data is corrupt: {0}")]
    Corrupt(String),
    /// A snapshot could not be serialized for persistence
    #[error("failed to serialize snapshot: {0}")]
    Serialization(String),
    /// The backend has shut down
    #[error("backend is closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Transient failures degrade reads to an empty snapshot instead of
    /// terminating the stream
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Corrupt(_))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// Settings store errors
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    /// The converter rejected the stored primitive
    #[error("failed to convert value stored under '{key}': {source}")]
    Conversion {
        key: String,
        #[source]
        source: ConversionError,
    },
    /// The stored primitive has a different kind than the key expects
    #[error("value stored under '{key}' is {found}, expected {expected}")]
    KindMismatch {
        key: String,
        expected: PrimitiveKind,
        found: PrimitiveKind,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The write worker is gone, so the mutation was never applied
    #[error("settings write queue is closed")]
    QueueClosed,
    #[error("settings store is already initialized")]
    AlreadyInitialized,
    #[error("settings store is not initialized")]
    NotInitialized,
}
