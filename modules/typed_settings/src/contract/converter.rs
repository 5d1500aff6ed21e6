//! Bidirectional mapping between logical values and storable primitives

use super::error::ConversionError;
use std::marker::PhantomData;

/// Pure, stateless mapping between a logical type `T` and a primitive `P`.
///
/// `decode` must accept every primitive `encode` can produce and should
/// return [`ConversionError`] for anything else rather than substituting a
/// value.
pub trait Converter<T, P>: Send + Sync {
    fn encode(&self, value: &T) -> P;

    fn decode(&self, primitive: P) -> Result<T, ConversionError>;
}

/// Converter built from a pair of functions, see [`converter`]
pub struct FnConverter<T, P, E, D> {
    encode: E,
    decode: D,
    _marker: PhantomData<fn(T) -> P>,
}

impl<T, P, E, D> Converter<T, P> for FnConverter<T, P, E, D>
where
    E: Fn(&T) -> P + Send + Sync,
    D: Fn(P) -> Result<T, ConversionError> + Send + Sync,
{
    fn encode(&self, value: &T) -> P {
        (self.encode)(value)
    }

    fn decode(&self, primitive: P) -> Result<T, ConversionError> {
        (self.decode)(primitive)
    }
}

/// Build a converter from an encode and a decode function.
///
/// ```rust
/// use typed_settings::{converter, ConversionError, Converter};
///
/// let on_off = converter(
///     |v: &bool| if *v { "on".to_string() } else { "off".to_string() },
///     |s: String| match s.as_str() {
///         "on" => Ok(true),
///         "off" => Ok(false),
///         _ => Err(ConversionError::unrecognized(s)),
///     },
/// );
/// assert_eq!(on_off.encode(&true), "on");
/// ```
pub fn converter<T, P, E, D>(encode: E, decode: D) -> FnConverter<T, P, E, D>
where
    E: Fn(&T) -> P + Send + Sync,
    D: Fn(P) -> Result<T, ConversionError> + Send + Sync,
{
    FnConverter {
        encode,
        decode,
        _marker: PhantomData,
    }
}
