use std::time::Duration;

use crate::dispatcher::DispatchOutcome;
use crate::error::DispatchError;
use crate::message::InboundMessage;
use crate::registry::MappingRegistry;

/// Hooks run around every dispatch.
///
/// `before` sees the message as delivered, `after` sees how dispatch ended.
/// Both run on the dispatching worker and must not block.
pub trait Middleware: Send + Sync {
    /// Called once when the middleware is added to a dispatcher.
    fn attached(&self, _registry: &MappingRegistry) {}

    fn before(&self, _msg: &InboundMessage) {}

    fn after(
        &self,
        _msg: &InboundMessage,
        _result: &Result<DispatchOutcome, DispatchError>,
        _latency: Duration,
    ) {
    }
}
