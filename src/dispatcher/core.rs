//! Dispatcher core module - per-message routing path.

use crate::converter::{ConverterChain, DecodedPayload, TargetType};
use crate::error::DispatchError;
use crate::ids::MessageId;
use crate::listener::MappingInformation;
use crate::message::InboundMessage;
use crate::middleware::Middleware;
use crate::registry::{HandlerRegistration, MappingRegistry};
use crate::typed::MessageContext;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

/// Successful dispatch of one message.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub message_id: MessageId,
    /// Destination queue the message was routed on
    pub queue: String,
    /// `component::method` of the listener that ran
    pub handler: String,
    /// Name of the converter that decoded the payload
    pub converter: &'static str,
    pub mapping: Arc<MappingInformation>,
    pub latency: Duration,
}

/// Routes inbound messages to their listeners.
///
/// Holds only immutable, shared state: the sealed [`MappingRegistry`], the
/// [`ConverterChain`] and the middleware list. Clones are cheap and every
/// clone can dispatch concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<MappingRegistry>,
    converters: Arc<ConverterChain>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: MappingRegistry, converters: ConverterChain) -> Self {
        Self::from_shared(Arc::new(registry), Arc::new(converters))
    }

    #[must_use]
    pub fn from_shared(registry: Arc<MappingRegistry>, converters: Arc<ConverterChain>) -> Self {
        Self {
            registry,
            converters,
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware; hooks run in insertion order.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        mw.attached(&self.registry);
        self.middlewares.push(mw);
    }

    #[must_use]
    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    #[must_use]
    pub fn converters(&self) -> &ConverterChain {
        &self.converters
    }

    /// The destination queue named by `msg`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::MissingDestination`] if the queue header is absent or empty.
    pub fn destination_of<'m>(&self, msg: &'m InboundMessage) -> Result<&'m str, DispatchError> {
        msg.destination()
            .ok_or(DispatchError::MissingDestination { message_id: msg.id })
    }

    /// Whether `mapping` serves the destination of `msg`.
    #[must_use]
    pub fn matches(mapping: &MappingInformation, msg: &InboundMessage) -> bool {
        mapping.matches_message(msg)
    }

    /// The listener for `destination`, least mapping first on ties.
    pub fn select_handler(
        &self,
        destination: &str,
    ) -> Result<&Arc<HandlerRegistration>, DispatchError> {
        self.registry.select_handler(destination)
    }

    /// Run `payload` through the converter chain.
    ///
    /// Returns the decoded value and the name of the converter that produced it.
    pub fn convert(
        &self,
        destination: &str,
        payload: &[u8],
        target: &TargetType,
    ) -> Result<(DecodedPayload, &'static str), DispatchError> {
        self.converters
            .decode_erased(payload, target)
            .map_err(|e| DispatchError::ConversionFailure {
                destination: destination.to_string(),
                target_type: e.type_name,
            })
    }

    /// Call the selected listener.
    ///
    /// Errors and panics raised by the listener are both reported as
    /// [`DispatchError::HandlerInvocation`] with the original cause attached.
    pub fn invoke(
        &self,
        registration: &HandlerRegistration,
        payload: DecodedPayload,
        context: MessageContext,
    ) -> Result<(), DispatchError> {
        let destination = context.queue.clone();
        let message_id = context.id;
        let handler = registration.handler();

        let result = match catch_unwind(AssertUnwindSafe(|| handler.invoke(payload, context))) {
            Ok(result) => result,
            Err(panic) => {
                let panic_message = panic_message(panic.as_ref());
                error!(
                    message_id = %message_id,
                    handler = %registration.handler_name(),
                    panic_message = %panic_message,
                    "Listener panicked"
                );
                Err(anyhow::anyhow!("listener panicked: {panic_message}"))
            }
        };

        result.map_err(|source| DispatchError::HandlerInvocation {
            destination,
            handler: registration.handler_name(),
            mapping: Arc::clone(registration.mapping()),
            source,
        })
    }

    /// Route one message end to end.
    ///
    /// Never panics on listener failure; every outcome comes back as a value
    /// the transport can act on.
    pub fn dispatch(&self, msg: &InboundMessage) -> Result<DispatchOutcome, DispatchError> {
        let span = info_span!(
            "dispatch",
            message_id = %msg.id,
            queue = msg.destination().unwrap_or_default()
        );
        span.in_scope(|| {
            let start = Instant::now();
            for mw in &self.middlewares {
                mw.before(msg);
            }

            let mut result = self.route(msg);
            let latency = start.elapsed();
            if let Ok(outcome) = &mut result {
                outcome.latency = latency;
            }

            for mw in &self.middlewares {
                mw.after(msg, &result, latency);
            }

            match &result {
                Ok(outcome) => info!(
                    handler = %outcome.handler,
                    converter = outcome.converter,
                    latency_us = latency.as_micros() as u64,
                    "Message dispatched"
                ),
                Err(err) => match err.handler_cause() {
                    Some(cause) => error!(
                        kind = err.kind(),
                        error = %err,
                        cause = %cause,
                        "Listener failed"
                    ),
                    None => warn!(kind = err.kind(), error = %err, "Message not dispatched"),
                },
            }
            result
        })
    }

    fn route(&self, msg: &InboundMessage) -> Result<DispatchOutcome, DispatchError> {
        // Destination lookup
        let destination = self.destination_of(msg)?;

        // Listener selection
        let registration = self.select_handler(destination)?;
        let target = registration.target_type();
        debug!(
            handler = %registration.handler_name(),
            target_type = target.type_name(),
            "Listener selected"
        );

        // Payload conversion
        let (payload, converter) = self.convert(destination, &msg.payload, &target)?;

        // Invocation
        let context = MessageContext {
            id: msg.id,
            queue: destination.to_string(),
            headers: msg.headers.clone(),
            mapping: Arc::clone(registration.mapping()),
        };
        self.invoke(registration, payload, context)?;

        Ok(DispatchOutcome {
            message_id: msg.id,
            queue: destination.to_string(),
            handler: registration.handler_name(),
            converter,
            mapping: Arc::clone(registration.mapping()),
            latency: Duration::ZERO,
        })
    }

    /// Encode `value` as an outbound payload for `destination`.
    pub fn encode<T: Serialize + 'static>(
        &self,
        destination: &str,
        value: &T,
    ) -> Result<Vec<u8>, DispatchError> {
        self.converters
            .encode(value)
            .map_err(|e| DispatchError::ConversionFailure {
                destination: destination.to_string(),
                target_type: e.type_name,
            })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
