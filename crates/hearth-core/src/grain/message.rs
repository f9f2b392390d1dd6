//! Grain Message Types

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One call into a grain: the method name plus a JSON payload.
///
/// The runtime never looks inside the payload; it only carries it to the
/// activation and carries the reply back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrainMessage {
    pub method: String,
    #[serde(default)]
    pub payload: Value,
}

impl GrainMessage {
    pub fn new(method: impl Into<String>, payload: Value) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }

    /// Message with a `null` payload.
    pub fn method(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Deserialize the payload into a typed request.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            anyhow::anyhow!("invalid payload for method {:?}: {}", self.method, e)
        })
    }
}
