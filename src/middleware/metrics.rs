use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::dispatcher::DispatchOutcome;
use crate::error::DispatchError;
use crate::message::InboundMessage;
use crate::registry::MappingRegistry;

/// Bucket used for messages without a destination header
pub const NO_DESTINATION: &str = "<none>";

/// Bucket shared by every destination no listener serves
pub const UNROUTABLE: &str = "<unroutable>";

#[derive(Debug, Default)]
struct QueueCounters {
    dispatched: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    total_latency_ns: AtomicU64,
}

/// Point-in-time copy of one queue's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueMetrics {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_latency: Duration,
}

impl QueueMetrics {
    /// Mean dispatch latency, zero before the first completion.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let completed = (self.succeeded + self.failed) as u64;
        if completed == 0 {
            Duration::ZERO
        } else {
            let nanos = self.total_latency.as_nanos() / u128::from(completed);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        }
    }
}

/// Dispatch counters per destination queue.
///
/// Counters are atomics inside a concurrent map, so recording never takes a
/// global lock. Failures are also counted by [`DispatchError::kind`].
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    queues: DashMap<String, QueueCounters>,
    failures_by_kind: DashMap<&'static str, AtomicUsize>,
    dispatch_count: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create counters for `queues` up front so snapshots list them before
    /// their first message.
    pub fn pre_register_queues<'a>(&self, queues: impl IntoIterator<Item = &'a str>) {
        for queue in queues {
            self.queues.entry(queue.to_string()).or_default();
        }
    }

    /// Total messages seen, routable or not
    pub fn dispatch_count(&self) -> usize {
        self.dispatch_count.load(Ordering::Relaxed)
    }

    pub fn average_latency(&self) -> Duration {
        let count = self.dispatch_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Counters for one queue, if any message has been seen for it.
    pub fn queue(&self, queue: &str) -> Option<QueueMetrics> {
        self.queues.get(queue).map(|c| snapshot(&c))
    }

    /// All queues, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, QueueMetrics)> {
        let mut all: Vec<(String, QueueMetrics)> = self
            .queues
            .iter()
            .map(|entry| (entry.key().clone(), snapshot(entry.value())))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Number of failed dispatches of the given [`DispatchError::kind`]
    pub fn failures(&self, kind: &str) -> usize {
        self.failures_by_kind
            .get(kind)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Counters for the bucket `result` belongs to.
    ///
    /// Destinations without a listener share [`UNROUTABLE`], so only queues the
    /// registry serves ever get their own entry.
    fn counters(
        &self,
        msg: &InboundMessage,
        result: &Result<DispatchOutcome, DispatchError>,
    ) -> dashmap::mapref::one::Ref<'_, String, QueueCounters> {
        let queue = match result {
            Ok(outcome) => outcome.queue.as_str(),
            Err(DispatchError::Unroutable { .. }) => UNROUTABLE,
            Err(_) => msg.destination().unwrap_or(NO_DESTINATION),
        };
        if let Some(existing) = self.queues.get(queue) {
            return existing;
        }
        self.queues.entry(queue.to_string()).or_default().downgrade()
    }
}

fn snapshot(c: &QueueCounters) -> QueueMetrics {
    QueueMetrics {
        dispatched: c.dispatched.load(Ordering::Relaxed),
        succeeded: c.succeeded.load(Ordering::Relaxed),
        failed: c.failed.load(Ordering::Relaxed),
        total_latency: Duration::from_nanos(c.total_latency_ns.load(Ordering::Relaxed)),
    }
}

impl Middleware for MetricsMiddleware {
    fn attached(&self, registry: &MappingRegistry) {
        self.pre_register_queues(registry.destinations());
    }

    fn before(&self, _msg: &InboundMessage) {
        self.dispatch_count.fetch_add(1, Ordering::Relaxed);
    }

    fn after(
        &self,
        msg: &InboundMessage,
        result: &Result<DispatchOutcome, DispatchError>,
        latency: Duration,
    ) {
        let nanos = latency.as_nanos() as u64;
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);

        let counters = self.counters(msg, result);
        counters.dispatched.fetch_add(1, Ordering::Relaxed);
        counters.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
        match result {
            Ok(_) => {
                counters.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                drop(counters);
                self.failures_by_kind
                    .entry(err.kind())
                    .or_default()
                    .fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
