//! # Converter Module
//!
//! Payload conversion between raw message bytes and listener argument types.
//!
//! A [`ConverterChain`] holds an ordered list of [`MessageConverter`]s. For each
//! message the dispatcher asks converters, in order, to produce the type the
//! selected listener expects ([`TargetType`]); the first one that answers wins.
//! Converters decline by returning `None`.
//!
//! ```rust
//! use rqueue::converter::{ConverterChain, StringMessageConverter};
//! use std::sync::Arc;
//!
//! let chain = ConverterChain::with_converters(vec![Arc::new(StringMessageConverter)]).unwrap();
//! assert_eq!(chain.names(), vec!["string", "json"]);
//!
//! let n: i64 = chain.decode(b"42").unwrap();
//! assert_eq!(n, 42);
//! let s: String = chain.decode(b"plain text").unwrap();
//! assert_eq!(s, "plain text");
//! ```

mod builtin;
mod core;

pub use builtin::{BytesMessageConverter, JsonMessageConverter, StringMessageConverter};
pub use self::core::{
    ConversionError, ConverterChain, DecodedPayload, Direction, MessageConverter, OutgoingValue,
    TargetType,
};
