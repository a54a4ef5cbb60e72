use crate::converter::{DecodedPayload, TargetType};
use crate::ids::MessageId;
use crate::listener::MappingInformation;
use crate::message::HeaderVec;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// Trait implemented by typed queue listeners.
///
/// A listener receives a [`TypedMessage`] whose payload has already been
/// decoded into [`QueueHandler::Payload`] by the converter chain. Returning an
/// error (or panicking) is reported to the transport as a handler invocation
/// failure.
pub trait QueueHandler: Send + Sync + 'static {
    /// The decoded payload type
    type Payload: DeserializeOwned + Send + 'static;

    /// Handle one message
    fn handle(&self, message: TypedMessage<Self::Payload>) -> anyhow::Result<()>;
}

/// Routing metadata that accompanies a decoded payload.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub id: MessageId,
    /// Destination queue the message was delivered on
    pub queue: String,
    pub headers: HeaderVec,
    /// Mapping of the listener selected for this message
    pub mapping: Arc<MappingInformation>,
}

/// A message with its payload decoded into `T`.
#[derive(Debug, Clone)]
pub struct TypedMessage<T> {
    pub id: MessageId,
    pub queue: String,
    pub headers: HeaderVec,
    pub mapping: Arc<MappingInformation>,
    pub payload: T,
}

impl<T> TypedMessage<T> {
    #[must_use]
    pub fn from_context(context: MessageContext, payload: T) -> Self {
        Self {
            id: context.id,
            queue: context.queue,
            headers: context.headers,
            mapping: context.mapping,
            payload,
        }
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Type-erased listener as stored in the registry.
///
/// [`Typed`] adapts any [`QueueHandler`]; implement this directly only when the
/// argument type has to be chosen at runtime.
pub trait HandlerMethod: Send + Sync {
    /// The argument type the converter chain must produce
    fn target_type(&self) -> TargetType;

    /// Call the listener with a payload of [`HandlerMethod::target_type`].
    fn invoke(&self, payload: DecodedPayload, context: MessageContext) -> anyhow::Result<()>;
}

/// Adapter from [`QueueHandler`] to [`HandlerMethod`].
#[derive(Debug, Clone)]
pub struct Typed<H>(pub H);

impl<H: QueueHandler> HandlerMethod for Typed<H> {
    fn target_type(&self) -> TargetType {
        TargetType::of::<H::Payload>()
    }

    fn invoke(&self, payload: DecodedPayload, context: MessageContext) -> anyhow::Result<()> {
        let payload = payload.downcast::<H::Payload>().map_err(|_| {
            anyhow::anyhow!(
                "payload is not a {}",
                std::any::type_name::<H::Payload>()
            )
        })?;
        self.0.handle(TypedMessage::from_context(context, *payload))
    }
}

/// Wrap a typed listener for registration.
pub fn typed<H: QueueHandler>(handler: H) -> Arc<dyn HandlerMethod> {
    Arc::new(Typed(handler))
}

/// A closure acting as a [`QueueHandler`].
pub struct FnHandler<T, F> {
    f: F,
    _payload: PhantomData<fn(T)>,
}

impl<T, F> QueueHandler for FnHandler<T, F>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(TypedMessage<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    type Payload = T;

    fn handle(&self, message: TypedMessage<T>) -> anyhow::Result<()> {
        (self.f)(message)
    }
}

/// Register a closure as a listener.
///
/// ```rust
/// use rqueue::typed::{handler_fn, TypedMessage};
///
/// let handler = handler_fn(|msg: TypedMessage<i64>| {
///     anyhow::ensure!(msg.payload >= 0, "negative amount");
///     Ok(())
/// });
/// assert!(handler.target_type().is::<i64>());
/// ```
pub fn handler_fn<T, F>(f: F) -> Arc<dyn HandlerMethod>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(TypedMessage<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    typed(FnHandler {
        f,
        _payload: PhantomData,
    })
}
