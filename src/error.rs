/// Error taxonomy shared by the normalizer, registry and execution engine
///
/// Every failure carries its kind so front ends can map it without string matching.

use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, StepFnError>;

/// Errors surfaced by the registry, normalizer and execution engine
#[derive(Debug, Error)]
pub enum StepFnError {
    /// Workflow definition is missing `States`, a step `Type`, or another required field
    #[error("malformed definition: {0}")]
    MalformedDefinition(String),

    /// Routing token could not be decoded into `{Id, Handler}`
    #[error("malformed routing token: {0}")]
    MalformedRoutingToken(String),

    /// Stored write key differs from the caller's (or the record does not exist)
    #[error("incorrect write key for {id}")]
    IncorrectWriteKey { id: String },

    /// Read-only lookup found nothing under this id
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// Execution engine was routed to an id with no stored script
    #[error("script not found for {0}")]
    ScriptNotFound(String),

    /// Script failed to load or run
    #[error("script execution failed: {0}")]
    ScriptExecutionFailed(#[from] ScriptFailure),

    /// Handler returned a value with no JSON representation
    #[error("unserializable result: {0}")]
    UnserializableResult(String),

    /// Backing store unreachable or rejected the write
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Orchestration platform refused to create or update the workflow resource
    #[error("deployment of {id} failed: {reason}")]
    DeploymentFailure { id: String, reason: String },
}

/// Sub-kinds of `ScriptExecutionFailed`
#[derive(Debug, Error)]
pub enum ScriptFailure {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("handler `{0}` is not a function defined by the script")]
    HandlerNotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),
}

impl ScriptFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptFailure::Syntax(_) => "syntax_error",
            ScriptFailure::HandlerNotFound(_) => "handler_not_found",
            ScriptFailure::Runtime(_) => "runtime_exception",
            ScriptFailure::Timeout(_) => "timeout",
        }
    }
}

impl StepFnError {
    /// Stable tag identifying the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            StepFnError::MalformedDefinition(_) => "MalformedDefinition",
            StepFnError::MalformedRoutingToken(_) => "MalformedRoutingToken",
            StepFnError::IncorrectWriteKey { .. } => "IncorrectWriteKey",
            StepFnError::RecordNotFound(_) => "RecordNotFound",
            StepFnError::ScriptNotFound(_) => "ScriptNotFound",
            StepFnError::ScriptExecutionFailed(_) => "ScriptExecutionFailed",
            StepFnError::UnserializableResult(_) => "UnserializableResult",
            StepFnError::StorageFailure(_) => "StorageFailure",
            StepFnError::DeploymentFailure { .. } => "DeploymentFailure",
        }
    }
}

impl From<sqlx::Error> for StepFnError {
    fn from(err: sqlx::Error) -> Self {
        StepFnError::StorageFailure(err.to_string())
    }
}
