//! # Dispatcher Module
//!
//! Routes inbound queue messages to their listeners.
//!
//! ## Message Flow
//!
//! 1. The destination queue is read from the `QUEUE_NAME` header
//! 2. The registry selects the listener for that queue
//! 3. The converter chain decodes the payload into the listener's argument type
//! 4. The listener runs; errors and panics are captured
//! 5. The outcome (or a [`DispatchError`](crate::error::DispatchError)) goes
//!    back to the transport, which decides on retry, delay or dead-lettering
//!
//! ## Concurrency
//!
//! A [`Dispatcher`] only holds the sealed registry, the converter chain and the
//! middleware list, all immutable. Any number of workers can call
//! [`Dispatcher::dispatch`] at once; no timeout is applied to listeners.
//!
//! ```rust
//! use rqueue::converter::ConverterChain;
//! use rqueue::dispatcher::Dispatcher;
//! use rqueue::listener::{ListenerDeclaration, PropertiesResolver};
//! use rqueue::message::InboundMessage;
//! use rqueue::registry::RegistryBuilder;
//! use rqueue::typed::{handler_fn, TypedMessage};
//!
//! let registry = RegistryBuilder::new()
//!     .listener(
//!         "billing",
//!         "on_order",
//!         ListenerDeclaration::new(["orders"]),
//!         handler_fn(|msg: TypedMessage<serde_json::Value>| {
//!             assert_eq!(msg.payload["id"], 42);
//!             Ok(())
//!         }),
//!     )
//!     .build(&PropertiesResolver::new())
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(registry, ConverterChain::new());
//! let outcome = dispatcher
//!     .dispatch(&InboundMessage::for_queue("orders", r#"{"id":42}"#))
//!     .unwrap();
//! assert_eq!(outcome.handler, "billing::on_order");
//! ```

mod core;

pub use self::core::{DispatchOutcome, Dispatcher};
