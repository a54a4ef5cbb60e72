use super::{DecodedPayload, MessageConverter, OutgoingValue, TargetType};
use serde_json::Value;
use tracing::debug;

/// Generic JSON converter, the last-resort entry of every chain.
///
/// Decodes any `DeserializeOwned` target and encodes any `Serialize` value.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMessageConverter;

impl MessageConverter for JsonMessageConverter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn from_message(&self, payload: &[u8], target: &TargetType) -> Option<DecodedPayload> {
        let value: Value = match serde_json::from_slice(payload) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, target_type = target.type_name(), "Payload is not JSON");
                return None;
            }
        };
        match target.from_json(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(error = %e, target_type = target.type_name(), "JSON does not fit target type");
                None
            }
        }
    }

    fn to_message(&self, value: &OutgoingValue<'_>) -> Option<Vec<u8>> {
        let json = value.to_json().ok()?;
        serde_json::to_vec(&json).ok()
    }
}

/// Passes UTF-8 payloads through as `String`, without JSON quoting.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringMessageConverter;

impl MessageConverter for StringMessageConverter {
    fn name(&self) -> &'static str {
        "string"
    }

    fn from_message(&self, payload: &[u8], target: &TargetType) -> Option<DecodedPayload> {
        if !target.is::<String>() {
            return None;
        }
        let text = std::str::from_utf8(payload).ok()?;
        Some(Box::new(text.to_string()))
    }

    fn to_message(&self, value: &OutgoingValue<'_>) -> Option<Vec<u8>> {
        value
            .downcast_ref::<String>()
            .map(|s| s.as_bytes().to_vec())
    }
}

/// Hands raw payload bytes to listeners expecting `Vec<u8>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesMessageConverter;

impl MessageConverter for BytesMessageConverter {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn from_message(&self, payload: &[u8], target: &TargetType) -> Option<DecodedPayload> {
        target
            .is::<Vec<u8>>()
            .then(|| Box::new(payload.to_vec()) as DecodedPayload)
    }

    fn to_message(&self, value: &OutgoingValue<'_>) -> Option<Vec<u8>> {
        value.downcast_ref::<Vec<u8>>().cloned()
    }
}
