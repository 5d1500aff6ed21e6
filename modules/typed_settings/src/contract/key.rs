//! Type-safe key descriptors.
//!
//! A key names one slot in the store and fixes how its primitive is turned
//! into the logical value the application sees. There are four flavours:
//!
//! | Flavour           | Type               | `get` yields |
//! |-------------------|--------------------|--------------|
//! | raw               | `Key<P>`           | `Option<P>`  |
//! | raw + default     | `DefaultKey<P>`    | `P`          |
//! | converted         | `Key<T, P>`        | `Option<T>`  |
//! | converted+default | `DefaultKey<T, P>` | `T`          |
//!
//! ```rust
//! use typed_settings::keys::{int_key_or, string_key};
//!
//! let counter = int_key_or("counter", 0);
//! let nickname = string_key("nickname");
//! assert_eq!(counter.default_value(), &0);
//! assert_eq!(nickname.name(), "nickname");
//! ```

use super::converter::Converter;
use super::error::SettingsError;
use super::model::{Primitive, PrimitiveKind, PrimitiveValue, Snapshot};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Identity of a key: its name together with its primitive kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId {
    pub name: String,
    pub kind: PrimitiveKind,
}

impl KeyId {
    pub fn new(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.kind)
    }
}

/// Common capability of every key flavour, consumed by the settings store
pub trait Descriptor: Clone + Send + Sync + 'static {
    /// Logical value accepted by `set`
    type Value: Send + 'static;
    /// Value produced by `get` for each snapshot
    type Output: Clone + Send + Sync + 'static;

    fn name(&self) -> &str;

    fn kind(&self) -> PrimitiveKind;

    fn id(&self) -> KeyId {
        KeyId::new(self.name(), self.kind())
    }

    /// Map a logical value to the primitive persisted under [`Descriptor::name`]
    fn encode(&self, value: &Self::Value) -> PrimitiveValue;

    /// Read this key out of a snapshot
    fn project(&self, snapshot: &Snapshot) -> Result<Self::Output, SettingsError>;
}

enum Codec<T, P> {
    Raw {
        into_logical: fn(P) -> T,
        into_primitive: fn(&T) -> P,
    },
    Converted(Arc<dyn Converter<T, P>>),
}

impl<T, P> Clone for Codec<T, P> {
    fn clone(&self) -> Self {
        match self {
            Self::Raw {
                into_logical,
                into_primitive,
            } => Self::Raw {
                into_logical: *into_logical,
                into_primitive: *into_primitive,
            },
            Self::Converted(converter) => Self::Converted(Arc::clone(converter)),
        }
    }
}

fn identity<P>(primitive: P) -> P {
    primitive
}

/// Key without a default value; reads yield `None` when nothing is stored.
///
/// `T` is the logical type, `P` the primitive it is stored as. Raw keys have
/// `T == P`.
pub struct Key<T, P = T> {
    name: Cow<'static, str>,
    codec: Codec<T, P>,
}

impl<P: Primitive> Key<P, P> {
    /// Key storing `P` as-is
    pub fn raw(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            codec: Codec::Raw {
                into_logical: identity::<P>,
                into_primitive: P::clone,
            },
        }
    }
}

impl<T, P: Primitive> Key<T, P> {
    /// Key storing `T` through `converter`
    pub fn converted<C>(name: impl Into<Cow<'static, str>>, converter: C) -> Self
    where
        C: Converter<T, P> + 'static,
    {
        Self::with_shared_converter(name, Arc::new(converter))
    }

    /// Like [`Key::converted`] but reuses a converter shared between keys
    pub fn with_shared_converter(
        name: impl Into<Cow<'static, str>>,
        converter: Arc<dyn Converter<T, P>>,
    ) -> Self {
        Self {
            name: name.into(),
            codec: Codec::Converted(converter),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PrimitiveKind {
        P::KIND
    }

    pub fn is_converted(&self) -> bool {
        matches!(self.codec, Codec::Converted(_))
    }

    /// Attach a default, substituted whenever nothing is stored
    pub fn with_default(self, default: T) -> DefaultKey<T, P> {
        DefaultKey { key: self, default }
    }

    fn to_primitive(&self, value: &T) -> P {
        match &self.codec {
            Codec::Raw { into_primitive, .. } => into_primitive(value),
            Codec::Converted(converter) => converter.encode(value),
        }
    }

    /// `Ok(None)` when absent; errors for a foreign kind or a rejected decode
    fn lookup(&self, snapshot: &Snapshot) -> Result<Option<T>, SettingsError> {
        let Some(stored) = snapshot.get(&self.name) else {
            return Ok(None);
        };

        let primitive = P::from_value(stored).ok_or_else(|| SettingsError::KindMismatch {
            key: self.name.to_string(),
            expected: P::KIND,
            found: stored.kind(),
        })?;

        match &self.codec {
            Codec::Raw { into_logical, .. } => Ok(Some(into_logical(primitive))),
            Codec::Converted(converter) => converter
                .decode(primitive)
                .map(Some)
                .map_err(|source| SettingsError::Conversion {
                    key: self.name.to_string(),
                    source,
                }),
        }
    }
}

impl<T, P> Clone for Key<T, P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<T, P: Primitive> PartialEq for Key<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T, P: Primitive> Eq for Key<T, P> {}

impl<T, P: Primitive> fmt::Debug for Key<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("name", &self.name)
            .field("kind", &P::KIND)
            .field("converted", &self.is_converted())
            .finish()
    }
}

impl<T, P> Descriptor for Key<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Primitive,
{
    type Value = T;
    type Output = Option<T>;

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PrimitiveKind {
        P::KIND
    }

    fn encode(&self, value: &T) -> PrimitiveValue {
        self.to_primitive(value).into_value()
    }

    fn project(&self, snapshot: &Snapshot) -> Result<Option<T>, SettingsError> {
        self.lookup(snapshot)
    }
}

/// Key with a default value; reads never yield "absent"
pub struct DefaultKey<T, P = T> {
    key: Key<T, P>,
    default: T,
}

impl<T, P: Primitive> DefaultKey<T, P> {
    pub fn name(&self) -> &str {
        self.key.name()
    }

    pub fn kind(&self) -> PrimitiveKind {
        P::KIND
    }

    pub fn is_converted(&self) -> bool {
        self.key.is_converted()
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// The same slot viewed without the default
    pub fn without_default(&self) -> &Key<T, P> {
        &self.key
    }
}

impl<T: Clone, P> Clone for DefaultKey<T, P> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            default: self.default.clone(),
        }
    }
}

impl<T, P: Primitive> PartialEq for DefaultKey<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T, P: Primitive> Eq for DefaultKey<T, P> {}

impl<T: fmt::Debug, P: Primitive> fmt::Debug for DefaultKey<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultKey")
            .field("name", &self.key.name)
            .field("kind", &P::KIND)
            .field("converted", &self.key.is_converted())
            .field("default", &self.default)
            .finish()
    }
}

impl<T, P> Descriptor for DefaultKey<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Primitive,
{
    type Value = T;
    type Output = T;

    fn name(&self) -> &str {
        self.key.name()
    }

    fn kind(&self) -> PrimitiveKind {
        P::KIND
    }

    fn encode(&self, value: &T) -> PrimitiveValue {
        self.key.encode(value)
    }

    fn project(&self, snapshot: &Snapshot) -> Result<T, SettingsError> {
        Ok(self
            .key
            .lookup(snapshot)?
            .unwrap_or_else(|| self.default.clone()))
    }
}

macro_rules! key_constructors {
    ($prim:ty, $label:literal, $raw:ident, $raw_or:ident, $with:ident, $with_or:ident) => {
        #[doc = concat!("Raw ", $label, " key")]
        pub fn $raw(name: impl Into<Cow<'static, str>>) -> Key<$prim> {
            Key::raw(name)
        }

        #[doc = concat!("Raw ", $label, " key with a default")]
        pub fn $raw_or(name: impl Into<Cow<'static, str>>, default: $prim) -> DefaultKey<$prim> {
            Key::raw(name).with_default(default)
        }

        #[doc = concat!("Key storing `T` as ", $label, " through `converter`")]
        pub fn $with<T, C>(name: impl Into<Cow<'static, str>>, converter: C) -> Key<T, $prim>
        where
            C: Converter<T, $prim> + 'static,
        {
            Key::converted(name, converter)
        }

        #[doc = concat!("Key storing `T` as ", $label, " through `converter`, with a default")]
        pub fn $with_or<T, C>(
            name: impl Into<Cow<'static, str>>,
            converter: C,
            default: T,
        ) -> DefaultKey<T, $prim>
        where
            C: Converter<T, $prim> + 'static,
        {
            Key::converted(name, converter).with_default(default)
        }
    };
}

/// Key constructors, four per primitive kind
pub mod keys {
    use super::*;

    key_constructors!(bool, "bool", bool_key, bool_key_or, bool_key_with, bool_key_with_or);
    key_constructors!(i32, "32-bit integer", int_key, int_key_or, int_key_with, int_key_with_or);
    key_constructors!(i64, "64-bit integer", long_key, long_key_or, long_key_with, long_key_with_or);
    key_constructors!(f32, "32-bit float", float_key, float_key_or, float_key_with, float_key_with_or);
    key_constructors!(f64, "64-bit float", double_key, double_key_or, double_key_with, double_key_with_or);
    key_constructors!(String, "string", string_key, string_key_or, string_key_with, string_key_with_or);
    key_constructors!(
        BTreeSet<String>,
        "string set",
        string_set_key,
        string_set_key_or,
        string_set_key_with,
        string_set_key_with_or
    );
}
