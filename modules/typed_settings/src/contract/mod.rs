//! Contract layer - keys, converters, primitive model and errors
//!
//! Everything here is pure: nothing in this layer touches a backend.

pub mod converter;
pub mod error;
pub mod key;
pub mod model;

pub use converter::{converter, Converter, FnConverter};
pub use error::{BackendError, ConversionError, SettingsError};
pub use key::{keys, DefaultKey, Descriptor, Key, KeyId};
pub use model::{Primitive, PrimitiveKind, PrimitiveValue, Snapshot};
