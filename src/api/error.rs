/// HTTP mapping of library errors
///
/// Every failure leaves as `{ "error": <message>, "kind": <kind> }`.

use crate::error::StepFnError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    /// Failure reported by the registry or engine
    Core(StepFnError),
    /// Request body could not be used at all
    BadRequest(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl From<StepFnError> for ApiError {
    fn from(err: StepFnError) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BadRequest", message.clone()),
            ApiError::Core(err) => {
                let status = match err {
                    StepFnError::MalformedDefinition(_) | StepFnError::MalformedRoutingToken(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    StepFnError::RecordNotFound(_) | StepFnError::ScriptNotFound(_) => StatusCode::NOT_FOUND,
                    StepFnError::IncorrectWriteKey { .. } => StatusCode::CONFLICT,
                    StepFnError::ScriptExecutionFailed(_) | StepFnError::UnserializableResult(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    StepFnError::DeploymentFailure { .. } => StatusCode::BAD_GATEWAY,
                    StepFnError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind(), err.to_string())
            }
        };

        let body = ErrorResponse {
            error: message,
            kind: kind.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, ApiError>;
