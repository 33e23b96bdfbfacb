//! Servers controller.
//!
//! Each handler takes the `RequestContext` stamped by the auth middleware and
//! forwards the call to the compute backend. Request bodies are not
//! interpreted beyond checking that they are JSON objects.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;

use adaptor_shared_types::RequestContext;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

/// Accept only a JSON object as request body.
fn object_body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    let Json(body) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    if !body.is_object() {
        return Err(ApiError::bad_request("Malformed request body: expected a JSON object"));
    }
    Ok(body)
}

/// Backend replies without a body (e.g. Nova's 202 on actions) become an empty response.
fn reply(status: StatusCode, body: Value) -> Response {
    if body.is_null() {
        status.into_response()
    } else {
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Collection
// ============================================================================

/// List servers.
pub async fn index(
    State(state): State<ApiState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<Response> {
    let body = state.compute.list_servers(&ctx).await?;
    Ok(reply(StatusCode::OK, body))
}

/// List servers with details.
pub async fn detail(
    State(state): State<ApiState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<Response> {
    let body = state.compute.list_servers_detail(&ctx).await?;
    Ok(reply(StatusCode::OK, body))
}

/// Create a server. The body goes to the backend unchanged.
pub async fn create(
    State(state): State<ApiState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let body = object_body(payload)?;

    info!(
        backend = state.compute.name(),
        user_id = ctx.user_id.as_deref().unwrap_or("-"),
        request_id = ctx.request_id.as_deref().unwrap_or("-"),
        "Forwarding server create"
    );

    let created = state.compute.create_server(&ctx, body).await?;
    Ok(reply(StatusCode::ACCEPTED, created))
}

// ============================================================================
// Member
// ============================================================================

/// Show one server.
pub async fn show(
    State(state): State<ApiState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let body = state.compute.get_server(&ctx, &id).await?;
    Ok(reply(StatusCode::OK, body))
}

pub async fn update(
    State(state): State<ApiState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let body = object_body(payload)?;
    let updated = state.compute.update_server(&ctx, &id, body).await?;
    Ok(reply(StatusCode::OK, updated))
}

pub async fn delete(
    State(state): State<ApiState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    info!(%id, backend = state.compute.name(), "Forwarding server delete");
    state.compute.delete_server(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run a server action such as `{"reboot": {"type": "SOFT"}}`.
pub async fn action(
    State(state): State<ApiState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let body = object_body(payload)?;
    let result = state.compute.server_action(&ctx, &id, body).await?;
    Ok(reply(StatusCode::ACCEPTED, result))
}

// ============================================================================
// Health
// ============================================================================

pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "dalek-api",
        "compute_backend": state.compute.name(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_body_accepts_objects() {
        let body = object_body(Ok(Json(json!({ "server": {} })))).unwrap();
        assert_eq!(body, json!({ "server": {} }));
    }

    #[test]
    fn test_object_body_rejects_arrays() {
        let err = object_body(Ok(Json(json!([1, 2])))).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_null_reply_has_no_body() {
        let response = reply(StatusCode::ACCEPTED, Value::Null);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().get("content-type").is_none());
    }
}
