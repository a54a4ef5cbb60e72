use crate::error::ConfigurationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::JsonMessageConverter;

/// A decoded payload, type-erased until the dispatcher hands it to its listener.
pub type DecodedPayload = Box<dyn Any + Send>;

/// The argument type a listener expects.
///
/// Besides identifying the type, it carries a JSON materialiser so generic
/// converters can build a value of a type they know nothing about.
#[derive(Clone, Copy)]
pub struct TargetType {
    type_id: TypeId,
    type_name: &'static str,
    from_json: fn(Value) -> serde_json::Result<DecodedPayload>,
}

fn from_json_value<T>(value: Value) -> serde_json::Result<DecodedPayload>
where
    T: DeserializeOwned + Send + 'static,
{
    serde_json::from_value::<T>(value).map(|v| Box::new(v) as DecodedPayload)
}

impl TargetType {
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            from_json: from_json_value::<T>,
        }
    }

    /// Whether the target is exactly `T`.
    #[inline]
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Build a value of the target type from a JSON document.
    pub fn from_json(&self, value: Value) -> serde_json::Result<DecodedPayload> {
        (self.from_json)(value)
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetType").field(&self.type_name).finish()
    }
}

/// A value about to be encoded into a message payload.
pub struct OutgoingValue<'a> {
    value: &'a dyn Any,
    type_name: &'static str,
    to_json: fn(&dyn Any) -> serde_json::Result<Value>,
}

fn to_json_value<T: Serialize + 'static>(value: &dyn Any) -> serde_json::Result<Value> {
    match value.downcast_ref::<T>() {
        Some(v) => serde_json::to_value(v),
        None => Err(<serde_json::Error as serde::ser::Error>::custom(
            "outgoing value does not match its serializer",
        )),
    }
}

impl<'a> OutgoingValue<'a> {
    pub fn of<T: Serialize + 'static>(value: &'a T) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
            to_json: to_json_value::<T>,
        }
    }

    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&'a T> {
        self.value.downcast_ref::<T>()
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        (self.to_json)(self.value)
    }
}

/// Decodes message payloads into listener arguments and back.
///
/// Returning `None` declines the conversion and lets the next converter in the
/// chain try. A converter should decline rather than fail when it does not
/// support the requested type or cannot parse the payload.
pub trait MessageConverter: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Try to decode `payload` into a value of `target`.
    fn from_message(&self, payload: &[u8], target: &TargetType) -> Option<DecodedPayload>;

    /// Try to encode `value` into a payload.
    fn to_message(&self, value: &OutgoingValue<'_>) -> Option<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Decode,
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Decode => f.write_str("decode"),
            Direction::Encode => f.write_str("encode"),
        }
    }
}

/// No converter in the chain accepted the conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no message converter could {direction} {type_name}")]
pub struct ConversionError {
    pub type_name: &'static str,
    pub direction: Direction,
}

/// Ordered list of converters, tried first to last; the first success wins.
///
/// The generic [`JsonMessageConverter`] is always appended last, so
/// user-supplied converters take precedence and a fallback always exists.
/// The chain is fixed once built.
#[derive(Clone)]
pub struct ConverterChain {
    converters: Vec<Arc<dyn MessageConverter>>,
}

impl Default for ConverterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterChain {
    /// A chain holding only the default JSON converter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            converters: vec![Arc::new(JsonMessageConverter)],
        }
    }

    /// A chain of `converters` followed by the default JSON converter.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::EmptyConverterList`] if `converters` is empty; use
    /// [`ConverterChain::new`] for a default-only chain.
    pub fn with_converters(
        mut converters: Vec<Arc<dyn MessageConverter>>,
    ) -> Result<Self, ConfigurationError> {
        if converters.is_empty() {
            return Err(ConfigurationError::EmptyConverterList);
        }
        converters.push(Arc::new(JsonMessageConverter));
        Ok(Self { converters })
    }

    #[must_use]
    pub fn converters(&self) -> &[Arc<dyn MessageConverter>] {
        &self.converters
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    /// Decode `payload` into `target`, returning the value and the converter that produced it.
    ///
    /// A converter that answers with a value of the wrong type is skipped.
    pub fn decode_erased(
        &self,
        payload: &[u8],
        target: &TargetType,
    ) -> Result<(DecodedPayload, &'static str), ConversionError> {
        for converter in &self.converters {
            let Some(value) = converter.from_message(payload, target) else {
                continue;
            };
            let produced: &dyn Any = &*value;
            if produced.type_id() == target.type_id() {
                debug!(
                    converter = converter.name(),
                    target_type = target.type_name(),
                    "Payload decoded"
                );
                return Ok((value, converter.name()));
            }
            warn!(
                converter = converter.name(),
                target_type = target.type_name(),
                "Converter produced a value of the wrong type - skipping"
            );
        }
        Err(ConversionError {
            type_name: target.type_name(),
            direction: Direction::Decode,
        })
    }

    /// Decode `payload` into a `T`.
    pub fn decode<T>(&self, payload: &[u8]) -> Result<T, ConversionError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let target = TargetType::of::<T>();
        let (value, _) = self.decode_erased(payload, &target)?;
        value.downcast::<T>().map(|v| *v).map_err(|_| ConversionError {
            type_name: target.type_name(),
            direction: Direction::Decode,
        })
    }

    /// Encode `value` with the first converter that accepts it.
    pub fn encode<T: Serialize + 'static>(&self, value: &T) -> Result<Vec<u8>, ConversionError> {
        let outgoing = OutgoingValue::of(value);
        for converter in &self.converters {
            if let Some(bytes) = converter.to_message(&outgoing) {
                debug!(
                    converter = converter.name(),
                    source_type = outgoing.type_name(),
                    "Payload encoded"
                );
                return Ok(bytes);
            }
        }
        Err(ConversionError {
            type_name: outgoing.type_name(),
            direction: Direction::Encode,
        })
    }
}

impl fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterChain")
            .field("converters", &self.names())
            .finish()
    }
}
