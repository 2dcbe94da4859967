/// Step invocation endpoint
///
/// The orchestration platform calls this once per rewritten step. The routing
/// token rides in the `x-client-context` header and the step payload is the body.

use crate::api::{
    error::{ApiError, ApiResult},
    registrations::AppState,
};
use axum::{body::Bytes, extract::State, http::HeaderMap, response::Json, routing::post, Router};
use serde_json::Value;

pub fn create_invoke_routes() -> Router<AppState> {
    Router::new().route("/invoke", post(invoke))
}

/// POST /invoke
/// Header: x-client-context: <routing token>
/// Body: JSON payload handed to the handler
async fn invoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    // Parse JSON body manually so an empty body means `null`
    let payload: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("❌ Invalid JSON payload for invocation: {}", e);
            ApiError::BadRequest(format!("payload is not JSON: {e}"))
        })?
    };

    let result = state.engine.execute(&headers, payload).await?;
    Ok(Json(result))
}
