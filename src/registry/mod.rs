//! # Registry Module
//!
//! The mapping registry: which listener serves which destination queue.
//!
//! ## Overview
//!
//! The registry is built once at startup by a [`RegistryBuilder`]:
//!
//! 1. **Collection**: listeners are added explicitly with
//!    [`RegistryBuilder::listener`] or by scanning a component with
//!    [`RegistryBuilder::component`].
//! 2. **Resolution**: [`RegistryBuilder::build`] resolves every declaration
//!    through an [`ExpressionResolver`](crate::listener::ExpressionResolver).
//!    Listeners whose mapping names no queue are logged and skipped; resolution
//!    errors abort the build.
//! 3. **Indexing**: each registration is indexed under every queue it serves,
//!    with the least mapping first in every bucket.
//!
//! The result is a [`MappingRegistry`] that is never mutated again and can be
//! shared across dispatch workers behind an `Arc`.

mod core;

pub use self::core::{HandlerRegistration, MappingRegistry, RegistryBuilder, SkippedListener};
