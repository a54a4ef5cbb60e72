#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Tests for the coroutine worker pool
//!
//! # Test Coverage
//!
//! - Results come back on each submission's own reply channel
//! - Many concurrent submissions across several workers
//! - A failing listener only fails its own message
//! - Pool metrics after the queue drains

mod common;

use common::recording_handler;
use rqueue::converter::ConverterChain;
use rqueue::dispatcher::Dispatcher;
use rqueue::listener::{ListenerDeclaration, PropertiesResolver};
use rqueue::message::InboundMessage;
use rqueue::registry::RegistryBuilder;
use rqueue::typed::{handler_fn, TypedMessage};
use rqueue::worker_pool::{WorkerPool, WorkerPoolConfig};
use std::sync::Arc;

fn shared_dispatcher(builder: RegistryBuilder) -> Arc<Dispatcher> {
    let registry = builder.build(&PropertiesResolver::new()).unwrap();
    Arc::new(Dispatcher::new(registry, ConverterChain::new()))
}

fn pool(workers: usize, dispatcher: Arc<Dispatcher>) -> WorkerPool {
    // SAFETY: listeners in these tests hold no thread-local state
    unsafe { WorkerPool::new(WorkerPoolConfig::new(workers, 0x10000), dispatcher) }
}

#[test]
fn test_single_submission_round_trip() {
    let (handler, calls) = recording_handler::<i64>();
    let dispatcher = shared_dispatcher(RegistryBuilder::new().listener(
        "billing",
        "on_order",
        ListenerDeclaration::new(["orders"]),
        handler,
    ));
    let pool = pool(1, dispatcher);

    let msg = InboundMessage::for_queue("orders", "42");
    let id = msg.id;
    let outcome = pool.submit(msg).unwrap().recv().unwrap().unwrap();

    assert_eq!(outcome.message_id, id);
    assert_eq!(outcome.handler, "billing::on_order");
    assert_eq!(*calls.lock(), vec![("orders".to_string(), 42)]);
}

#[test]
fn test_concurrent_submissions_all_complete() {
    let (handler, calls) = recording_handler::<i64>();
    let dispatcher = shared_dispatcher(RegistryBuilder::new().listener(
        "c",
        "m",
        ListenerDeclaration::new(["orders", "refunds"]),
        handler,
    ));
    let pool = pool(4, dispatcher);

    let replies: Vec<_> = (0..100)
        .map(|i| {
            let queue = if i % 2 == 0 { "orders" } else { "refunds" };
            pool.submit(InboundMessage::for_queue(queue, i.to_string()))
                .unwrap()
        })
        .collect();
    for reply in replies {
        assert!(reply.recv().unwrap().is_ok());
    }

    let mut payloads: Vec<i64> = calls.lock().iter().map(|(_, p)| *p).collect();
    payloads.sort_unstable();
    assert_eq!(payloads, (0..100).collect::<Vec<i64>>());

    let metrics = pool.metrics();
    assert_eq!(metrics.get_submitted_count(), 100);
    assert_eq!(metrics.get_completed_count(), 100);
    assert_eq!(metrics.get_failed_count(), 0);
    assert_eq!(metrics.get_queue_depth(), 0);
}

#[test]
fn test_failure_is_isolated_to_its_message() {
    let dispatcher = shared_dispatcher(RegistryBuilder::new().listener(
        "c",
        "picky",
        ListenerDeclaration::new(["jobs"]).num_retries("2"),
        handler_fn(|msg: TypedMessage<i64>| {
            if msg.payload % 3 == 0 {
                anyhow::bail!("multiple of three: {}", msg.payload);
            }
            Ok(())
        }),
    ));
    let pool = pool(3, dispatcher);

    let replies: Vec<_> = (1..=9)
        .map(|i| {
            let reply = pool
                .submit(InboundMessage::for_queue("jobs", i.to_string()))
                .unwrap();
            (i, reply)
        })
        .collect();

    for (i, reply) in replies {
        let result = reply.recv().unwrap();
        if i % 3 == 0 {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), "handler_invocation_failure");
            assert_eq!(err.mapping().unwrap().num_retries(), Some(2));
        } else {
            assert!(result.is_ok(), "message {i} should succeed");
        }
    }

    assert_eq!(pool.metrics().get_completed_count(), 9);
    assert_eq!(pool.metrics().get_failed_count(), 3);
}

#[test]
fn test_unroutable_message_reported_on_reply() {
    let dispatcher = shared_dispatcher(RegistryBuilder::new());
    let pool = pool(2, dispatcher);

    let err = pool
        .submit(InboundMessage::for_queue("nowhere", "1"))
        .unwrap()
        .recv()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), "unroutable");
    assert_eq!(pool.config().num_workers, 2);
}
