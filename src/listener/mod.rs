//! # Listener Module
//!
//! Listener declarations and their resolution into [`MappingInformation`].
//!
//! A declaration is the queue-listener equivalent of an annotation: a set of
//! unresolved expressions naming the queues a handler serves, whether those
//! queues are delayed, the retry budget and the dead letter queue. At startup
//! the registry hands every declaration to an [`ExpressionResolver`] and keeps
//! the resulting mapping if it names at least one queue.
//!
//! ## Expressions
//!
//! | Expression | Resolves to |
//! |------------|-------------|
//! | `orders` | `["orders"]` |
//! | `orders, invoices` | `["orders", "invoices"]` |
//! | `[orders, invoices]` | `["orders", "invoices"]` |
//! | `${queue.orders}` | value of the `queue.orders` property, split on commas |
//! | `${queue.orders:orders}` | the property, or `orders` when unset |
//!
//! ## Failure modes
//!
//! - A dead letter queue expression resolving to zero or several names is a
//!   [`ConfigurationError`](crate::error::ConfigurationError) and aborts startup.
//! - A declaration resolving to no queue names is logged and skipped.

mod declaration;
mod mapping;
mod resolver;

pub use declaration::{ListenerComponent, ListenerDeclaration, ListenerMethod};
pub use mapping::MappingInformation;
pub use resolver::{ExpressionResolver, PropertiesResolver, ResolveError};
