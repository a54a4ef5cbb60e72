//! Inbound queue messages as handed over by the transport layer.
//!
//! The transport owns fetching, acknowledging and re-enqueueing. This module only
//! models what the dispatcher needs to route a message: its headers (one of which
//! names the destination queue) and the raw payload bytes.

use crate::ids::MessageId;
use smallvec::SmallVec;
use std::sync::Arc;

/// Header carrying the destination queue name.
pub const QUEUE_NAME: &str = "QUEUE_NAME";

/// Header carrying the transport-assigned message id (ULID string).
pub const MESSAGE_ID: &str = "MESSAGE_ID";

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the dispatch path
///
/// Header names use `Arc<str>` since the same handful of names repeat on
/// every message; values are per-message data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// A message delivered to the dispatcher.
///
/// Produced by the transport, never mutated by the routing core.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Message id used for log correlation
    pub id: MessageId,
    /// Message metadata, including the [`QUEUE_NAME`] destination header
    pub headers: HeaderVec,
    /// Raw message body
    pub payload: Vec<u8>,
}

impl InboundMessage {
    /// Build a message from headers and payload.
    ///
    /// The id is taken from the [`MESSAGE_ID`] header when it holds a valid
    /// ULID, otherwise a fresh one is generated.
    #[must_use]
    pub fn new(headers: HeaderVec, payload: Vec<u8>) -> Self {
        let id = MessageId::from_header_or_new(
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(MESSAGE_ID))
                .map(|(_, v)| v.as_str()),
        );
        Self {
            id,
            headers,
            payload,
        }
    }

    /// Convenience constructor for a message addressed to `queue`.
    #[must_use]
    pub fn for_queue(queue: &str, payload: impl Into<Vec<u8>>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from(QUEUE_NAME), queue.to_string()));
        Self::new(headers, payload.into())
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    ///
    /// Setting [`MESSAGE_ID`] to a valid ULID also replaces [`Self::id`].
    pub fn set_header(&mut self, name: &str, value: String) {
        if name.eq_ignore_ascii_case(MESSAGE_ID) {
            if let Ok(id) = value.parse::<MessageId>() {
                self.id = id;
            }
        }
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// The destination queue named in the headers, if present and non-empty.
    #[inline]
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.get_header(QUEUE_NAME).filter(|q| !q.is_empty())
    }
}
