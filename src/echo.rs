use crate::typed::{QueueHandler, TypedMessage};
use serde_json::Value;
use tracing::info;

/// Payload key that makes [`EchoListener`] fail, with the value as reason
pub const FAIL_KEY: &str = "echo_fail";

/// Listener that logs whatever it receives.
///
/// Used by the CLI to exercise declarations without application code. A
/// JSON object payload carrying [`FAIL_KEY`] makes it return an error, which
/// shows the failure path end to end.
#[derive(Debug, Clone, Default)]
pub struct EchoListener {
    pub name: String,
}

impl EchoListener {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl QueueHandler for EchoListener {
    type Payload = Value;

    fn handle(&self, msg: TypedMessage<Value>) -> anyhow::Result<()> {
        info!(
            listener = %self.name,
            message_id = %msg.id,
            queue = %msg.queue,
            payload = %msg.payload,
            "Echo"
        );
        if let Some(reason) = msg.payload.get(FAIL_KEY) {
            anyhow::bail!("echo listener asked to fail: {reason}");
        }
        Ok(())
    }
}
