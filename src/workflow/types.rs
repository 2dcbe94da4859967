/// Core registry type definitions
///
/// Records are persisted one per registered workflow; registration requests and
/// outcomes are the JSON shapes exchanged with front ends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted workflow registration
///
/// `definition` is always the normalized definition, never the caller's raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// Registry id (`S` + 26 base32 chars), immutable after creation
    pub id: String,
    /// Source of the handler script, replaced wholesale on update
    pub script: String,
    /// Normalized workflow definition, JSON-encoded
    pub definition: String,
    /// Default run payload, JSON-encoded and owned by the caller
    pub input: String,
    /// Capability string required for every later update
    pub write_key: String,
}

/// Registration request from a front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    /// Existing id to update; absent or invalid means "register something new"
    #[serde(default)]
    pub id: Option<String>,
    pub script: String,
    /// JSON-encoded workflow definition
    pub definition: String,
    #[serde(default)]
    pub input: Value,
    pub write_key: String,
}

/// What a successful registration hands back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub id: String,
    pub deployed_resource_handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_header: Option<String>,
}

/// Read-only view of a record for debugging front ends
///
/// The write key is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordView {
    pub script: String,
    pub definition: String,
    pub input: String,
}

impl From<WorkflowRecord> for RecordView {
    fn from(record: WorkflowRecord) -> Self {
        Self {
            script: record.script,
            definition: record.definition,
            input: record.input,
        }
    }
}

/// Trace header forwarded by the caller, echoed back on registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceContext {
    pub header: Option<String>,
}

impl TraceContext {
    pub fn from_header(header: Option<&str>) -> Self {
        Self {
            header: header.filter(|h| !h.is_empty()).map(str::to_string),
        }
    }

    /// `Root=` component of a `Root=...;Parent=...;Sampled=...` header
    pub fn trace_id(&self) -> Option<String> {
        self.header.as_deref()?.split(';').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key.trim() == "Root").then(|| value.trim().to_string())
        })
    }
}
