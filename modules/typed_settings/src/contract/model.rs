//! Contract models for typed settings
//!
//! Primitive values are the only thing a backend ever persists. Everything
//! typed lives one layer up, in key descriptors.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Storable primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
    StringSet,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::StringSet => "string_set",
        };
        f.write_str(name)
    }
}

/// A value as persisted by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PrimitiveValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    StringSet(BTreeSet<String>),
}

impl PrimitiveValue {
    /// Kind of the stored value
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::Int(_) => PrimitiveKind::Int,
            Self::Long(_) => PrimitiveKind::Long,
            Self::Float(_) => PrimitiveKind::Float,
            Self::Double(_) => PrimitiveKind::Double,
            Self::String(_) => PrimitiveKind::String,
            Self::StringSet(_) => PrimitiveKind::StringSet,
        }
    }
}

/// Rust types that map one-to-one onto a [`PrimitiveValue`] variant.
///
/// Implemented for `bool`, `i32`, `i64`, `f32`, `f64`, `String` and
/// `BTreeSet<String>`; the set is closed.
pub trait Primitive: Clone + Send + Sync + 'static {
    const KIND: PrimitiveKind;

    fn into_value(self) -> PrimitiveValue;

    /// Returns `None` when `value` holds a different kind
    fn from_value(value: &PrimitiveValue) -> Option<Self>;
}

macro_rules! impl_primitive {
    ($ty:ty, $variant:ident) => {
        impl Primitive for $ty {
            const KIND: PrimitiveKind = PrimitiveKind::$variant;

            fn into_value(self) -> PrimitiveValue {
                PrimitiveValue::$variant(self)
            }

            fn from_value(value: &PrimitiveValue) -> Option<Self> {
                match value {
                    PrimitiveValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_primitive!(bool, Bool);
impl_primitive!(i32, Int);
impl_primitive!(i64, Long);
impl_primitive!(f32, Float);
impl_primitive!(f64, Double);
impl_primitive!(String, String);
impl_primitive!(BTreeSet<String>, StringSet);

/// Full, consistent view of every stored value at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, PrimitiveValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PrimitiveValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or replace the value stored under `name`
    pub fn insert(&mut self, name: impl Into<String>, value: PrimitiveValue) -> Option<PrimitiveValue> {
        self.entries.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<PrimitiveValue> {
        self.entries.remove(name)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrimitiveValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, PrimitiveValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, PrimitiveValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
