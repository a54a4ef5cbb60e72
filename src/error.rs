//! Error families of the routing core.
//!
//! [`ConfigurationError`] is raised while the registry or converter chain is
//! being built and aborts startup. [`DispatchError`] is returned per message and
//! never terminates the process; the transport uses it to decide between retry,
//! delay and dead-lettering.

use crate::ids::MessageId;
use crate::listener::MappingInformation;
use std::sync::Arc;
use thiserror::Error;

/// Startup-time failures. Any of these prevents the listener from starting.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "dead letter queue expression '{expression}' must resolve to exactly one queue, got {resolved:?}"
    )]
    DeadLetterQueue {
        expression: String,
        resolved: Vec<String>,
    },

    #[error("message converter list can not be empty")]
    EmptyConverterList,

    #[error("failed to resolve expression '{expression}': {reason}")]
    Resolve { expression: String, reason: String },

    #[error("retry count expression '{expression}' resolved to {value}; expected -1 or a non-negative integer")]
    InvalidRetryCount { expression: String, value: i64 },

    #[error("ambiguous mapping {mapping}: '{existing}' and '{duplicate}' declare identical listeners")]
    AmbiguousMapping {
        mapping: MappingInformation,
        existing: String,
        duplicate: String,
    },
}

/// Per-message failures reported back to the transport.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("message {message_id} has no destination queue header")]
    MissingDestination { message_id: MessageId },

    #[error("no listener registered for queue '{destination}'")]
    Unroutable { destination: String },

    #[error("no message converter could produce {target_type} for queue '{destination}'")]
    ConversionFailure {
        destination: String,
        target_type: &'static str,
    },

    #[error("an exception occurred while invoking listener '{handler}' for queue '{destination}'")]
    HandlerInvocation {
        destination: String,
        handler: String,
        mapping: Arc<MappingInformation>,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// The mapping of the selected listener, when dispatch got far enough to pick one.
    ///
    /// Carries the retry budget and dead letter queue the transport needs.
    #[must_use]
    pub fn mapping(&self) -> Option<&MappingInformation> {
        match self {
            DispatchError::HandlerInvocation { mapping, .. } => Some(mapping.as_ref()),
            _ => None,
        }
    }

    /// The original error raised by the listener, if this is an invocation failure.
    #[must_use]
    pub fn handler_cause(&self) -> Option<&anyhow::Error> {
        match self {
            DispatchError::HandlerInvocation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Short label used in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::MissingDestination { .. } => "missing_destination",
            DispatchError::Unroutable { .. } => "unroutable",
            DispatchError::ConversionFailure { .. } => "conversion_failure",
            DispatchError::HandlerInvocation { .. } => "handler_invocation_failure",
        }
    }
}
