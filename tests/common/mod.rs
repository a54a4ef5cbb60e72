#![allow(dead_code)]

use parking_lot::Mutex;
use rqueue::converter::{DecodedPayload, MessageConverter, OutgoingValue, TargetType};
use rqueue::typed::{handler_fn, HandlerMethod, TypedMessage};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Queue and payload of every call a recording listener received
pub type Calls<T> = Arc<Mutex<Vec<(String, T)>>>;

/// A listener that records its calls and succeeds.
pub fn recording_handler<T>() -> (Arc<dyn HandlerMethod>, Calls<T>)
where
    T: DeserializeOwned + Send + 'static,
{
    let calls: Calls<T> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let handler = handler_fn(move |msg: TypedMessage<T>| {
        sink.lock().push((msg.queue, msg.payload));
        Ok(())
    });
    (handler, calls)
}

/// A listener for `T` that never expects to be called.
pub fn noop_handler<T>() -> Arc<dyn HandlerMethod>
where
    T: DeserializeOwned + Send + 'static,
{
    handler_fn(|_msg: TypedMessage<T>| Ok(()))
}

type DecodeFn = dyn Fn(&[u8], &TargetType) -> Option<DecodedPayload> + Send + Sync;

/// Converter with a pluggable decode function that counts its calls.
pub struct CountingConverter {
    name: &'static str,
    decode: Box<DecodeFn>,
    pub decode_calls: AtomicUsize,
    pub encode_calls: AtomicUsize,
}

impl CountingConverter {
    pub fn new<F>(name: &'static str, decode: F) -> Arc<Self>
    where
        F: Fn(&[u8], &TargetType) -> Option<DecodedPayload> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name,
            decode: Box::new(decode),
            decode_calls: AtomicUsize::new(0),
            encode_calls: AtomicUsize::new(0),
        })
    }

    /// A converter that declines everything
    pub fn declining(name: &'static str) -> Arc<Self> {
        Self::new(name, |_, _| None)
    }

    pub fn decodes(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }
}

impl MessageConverter for CountingConverter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn from_message(&self, payload: &[u8], target: &TargetType) -> Option<DecodedPayload> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        (self.decode)(payload, target)
    }

    fn to_message(&self, _value: &OutgoingValue<'_>) -> Option<Vec<u8>> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        None
    }
}

/// Write `contents` to a temporary YAML file that lives as long as the handle.
pub fn listener_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("listeners_")
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
