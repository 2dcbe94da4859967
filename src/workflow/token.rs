/// Routing token codec
///
/// A routing token tells the shared execution engine which stored script to load
/// and which handler inside it to call. It travels through the orchestration
/// platform's client-context side channel as base64 JSON wrapped in a `custom`
/// object, which is the shape the platform's metadata schema accepts.

use crate::error::{Result, StepFnError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity carried with every redirected step invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingToken {
    /// Registry id of the workflow record whose script is loaded
    #[serde(rename = "Id")]
    pub registry_id: String,
    /// Global function in that script to call
    #[serde(rename = "Handler")]
    pub handler: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    custom: T,
}

impl RoutingToken {
    pub fn new(registry_id: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            registry_id: registry_id.into(),
            handler: handler.into(),
        }
    }

    /// Encode into the opaque transport-safe string
    pub fn encode(&self) -> String {
        let envelope = serde_json::json!({
            "custom": { "Id": self.registry_id, "Handler": self.handler }
        });
        BASE64.encode(envelope.to_string())
    }

    /// Exact inverse of [`RoutingToken::encode`]
    pub fn decode(encoded: &str) -> Result<Self> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|e| StepFnError::MalformedRoutingToken(format!("not base64: {e}")))?;
        let envelope: Envelope<HashMap<String, serde_json::Value>> = serde_json::from_slice(&raw)
            .map_err(|e| StepFnError::MalformedRoutingToken(format!("not a client context: {e}")))?;
        Self::from_custom_values(&envelope.custom)
    }

    fn from_custom_values(custom: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let field = |name: &str| {
            custom
                .get(name)
                .and_then(|v| v.as_str())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| StepFnError::MalformedRoutingToken(format!("missing `{name}`")))
        };
        Ok(Self {
            registry_id: field("Id")?,
            handler: field("Handler")?,
        })
    }
}

/// Anything the host platform uses to hand over routing metadata
///
/// The engine only needs the two fields back; how they arrive (an encoded
/// string, a header, an already-decoded client context) is the carrier's business.
pub trait RoutingCarrier {
    fn routing_token(&self) -> Result<RoutingToken>;
}

impl RoutingCarrier for str {
    fn routing_token(&self) -> Result<RoutingToken> {
        RoutingToken::decode(self)
    }
}

impl RoutingCarrier for String {
    fn routing_token(&self) -> Result<RoutingToken> {
        RoutingToken::decode(self)
    }
}

/// Already-decoded `custom` map, as a function runtime exposes client context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientContext {
    pub custom: HashMap<String, String>,
}

impl RoutingCarrier for ClientContext {
    fn routing_token(&self) -> Result<RoutingToken> {
        let values = self
            .custom
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        RoutingToken::from_custom_values(&values)
    }
}

impl RoutingCarrier for axum::http::HeaderMap {
    fn routing_token(&self) -> Result<RoutingToken> {
        let value = self
            .get(CLIENT_CONTEXT_HEADER)
            .ok_or_else(|| StepFnError::MalformedRoutingToken(format!("missing {CLIENT_CONTEXT_HEADER} header")))?;
        let encoded = value
            .to_str()
            .map_err(|e| StepFnError::MalformedRoutingToken(e.to_string()))?;
        RoutingToken::decode(encoded)
    }
}

/// Header carrying the encoded token on HTTP invocations
pub const CLIENT_CONTEXT_HEADER: &str = "x-client-context";
