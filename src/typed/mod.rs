//! # Typed Module
//!
//! Type-safe queue listeners.
//!
//! Listeners declare the payload type they expect; the dispatcher asks the
//! converter chain for exactly that type before invoking them, so listener code
//! never touches raw bytes.
//!
//! ## Usage
//!
//! ```rust
//! use rqueue::typed::{typed, QueueHandler, TypedMessage};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct OrderPlaced {
//!     order_id: u64,
//! }
//!
//! struct OrderListener;
//!
//! impl QueueHandler for OrderListener {
//!     type Payload = OrderPlaced;
//!
//!     fn handle(&self, msg: TypedMessage<OrderPlaced>) -> anyhow::Result<()> {
//!         tracing::info!(order_id = msg.payload.order_id, queue = %msg.queue, "order placed");
//!         Ok(())
//!     }
//! }
//!
//! let handler = typed(OrderListener);
//! assert!(handler.target_type().is::<OrderPlaced>());
//! ```
//!
//! Closures work too, through [`handler_fn`].

mod core;

pub use self::core::{
    handler_fn, typed, FnHandler, HandlerMethod, MessageContext, QueueHandler, Typed,
    TypedMessage,
};
