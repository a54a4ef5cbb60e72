//! # rqueue
//!
//! **rqueue** is the listener-routing core of a Redis-backed task queue client.
//! It decides which application listener handles an inbound queue message,
//! turns the raw payload into the listener's argument type and runs the
//! listener, reporting every outcome as a value the transport can act on.
//!
//! Fetching, acknowledging, delaying and dead-lettering messages belong to the
//! transport; this crate only routes.
//!
//! ## Architecture
//!
//! - **[`listener`]** - Listener declarations, expression resolution and [`MappingInformation`](listener::MappingInformation)
//! - **[`registry`]** - The sealed destination → listener index built at startup
//! - **[`converter`]** - Ordered converter chain with a JSON fallback
//! - **[`dispatcher`]** - Per-message destination lookup, conversion and invocation
//! - **[`typed`]** - Typed listener traits and closure adapters
//! - **[`middleware`]** - Dispatch hooks and per-queue metrics
//! - **[`worker_pool`]** - Coroutine workers sharing one dispatcher
//! - **[`config`]** - YAML declaration files
//! - **[`cli`]** - The `rqueue-cli` binary
//!
//! ### Startup
//!
//! ```mermaid
//! sequenceDiagram
//!     participant App
//!     participant Builder as RegistryBuilder
//!     participant Resolver as ExpressionResolver
//!     participant Registry as MappingRegistry
//!
//!     App->>Builder: listener(...) / component(...)
//!     App->>Builder: build(&resolver)
//!     loop every declaration
//!         Builder->>Resolver: resolve_strings / resolve_bool / resolve_int
//!         alt dead letter queue not exactly one name
//!             Builder-->>App: ConfigurationError (startup aborts)
//!         end
//!         alt no queue names
//!             Builder->>Builder: warn and skip
//!         end
//!         Builder->>Builder: index under every queue
//!     end
//!     Builder-->>App: sealed MappingRegistry
//! ```
//!
//! ### Dispatch
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Dispatcher
//!     participant Registry as MappingRegistry
//!     participant Chain as ConverterChain
//!     participant Listener
//!
//!     Transport->>Dispatcher: dispatch(&message)
//!     Dispatcher->>Dispatcher: destination_of (QUEUE_NAME header)
//!     Dispatcher->>Registry: select_handler(destination)
//!     Registry-->>Dispatcher: least matching registration
//!     Dispatcher->>Chain: decode into listener's TargetType
//!     Chain-->>Dispatcher: first converter that accepts
//!     Dispatcher->>Listener: invoke (panics caught)
//!     Dispatcher-->>Transport: DispatchOutcome or DispatchError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rqueue::converter::ConverterChain;
//! use rqueue::dispatcher::Dispatcher;
//! use rqueue::error::DispatchError;
//! use rqueue::listener::{ListenerDeclaration, PropertiesResolver};
//! use rqueue::message::InboundMessage;
//! use rqueue::registry::RegistryBuilder;
//! use rqueue::typed::{handler_fn, TypedMessage};
//!
//! let resolver = PropertiesResolver::new().with_property("jobs.queue", "jobs");
//! let registry = RegistryBuilder::new()
//!     .listener(
//!         "workers",
//!         "on_job",
//!         ListenerDeclaration::new(["${jobs.queue}"])
//!             .num_retries("3")
//!             .dead_letter_queue("jobs-dlq"),
//!         handler_fn(|_msg: TypedMessage<String>| anyhow::bail!("job failed")),
//!     )
//!     .build(&resolver)
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(registry, ConverterChain::new());
//! let err = dispatcher
//!     .dispatch(&InboundMessage::for_queue("jobs", r#""payload""#))
//!     .unwrap_err();
//!
//! assert!(matches!(err, DispatchError::HandlerInvocation { .. }));
//! let mapping = err.mapping().unwrap();
//! assert_eq!(mapping.num_retries(), Some(3));
//! assert_eq!(mapping.dead_letter_queue(), Some("jobs-dlq"));
//! ```
//!
//! ## Configuration
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `RQUEUE_WORKERS` | `4` | dispatch worker coroutines |
//! | `RQUEUE_STACK_SIZE` | `0x10000` | worker coroutine stack size |
//! | `RQUEUE_LOG_LEVEL` | `info` | log level |
//! | `RQUEUE_LOG_FORMAT` | `json` | `json` or `pretty` |

pub mod cli;
pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod ids;
pub mod listener;
pub mod logging;
pub mod message;
pub mod middleware;
pub mod registry;
pub mod runtime_config;
pub mod typed;
pub mod worker_pool;

pub use converter::ConverterChain;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{ConfigurationError, DispatchError};
pub use listener::{ListenerDeclaration, MappingInformation};
pub use message::InboundMessage;
pub use registry::{MappingRegistry, RegistryBuilder};
