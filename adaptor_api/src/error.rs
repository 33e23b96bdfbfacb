//! API error type and its Nova-style fault rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use compute::ComputeError;

pub type ApiResult<T> = Result<T, ApiError>;

/// An error reply.
///
/// Errors raised by the adaptor itself are rendered as
/// `{"<faultName>": {"code": .., "message": ..}}`. Errors returned by Nova
/// keep Nova's own status and JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug)]
enum ErrorBody {
    Fault(String),
    Passthrough(Value),
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Fault(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn into_body(self) -> Value {
        match self.body {
            ErrorBody::Passthrough(body) => body,
            ErrorBody::Fault(message) => {
                let mut fault = Map::new();
                fault.insert(
                    fault_name(self.status).to_string(),
                    json!({ "code": self.status.as_u16(), "message": message }),
                );
                Value::Object(fault)
            }
        }
    }
}

fn fault_name(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "badRequest",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "itemNotFound",
        StatusCode::METHOD_NOT_ALLOWED => "badMethod",
        StatusCode::CONFLICT => "conflictingRequest",
        StatusCode::PAYLOAD_TOO_LARGE => "overLimit",
        StatusCode::NOT_IMPLEMENTED => "notImplemented",
        StatusCode::SERVICE_UNAVAILABLE => "serviceUnavailable",
        _ => "computeFault",
    }
}

impl From<ComputeError> for ApiError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Upstream { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                match body {
                    Value::String(text) if text.is_empty() => {
                        ApiError::new(status, format!("Compute backend returned {status}"))
                    }
                    Value::String(text) => ApiError::new(status, text),
                    body => ApiError {
                        status,
                        body: ErrorBody::Passthrough(body),
                    },
                }
            }
            ComputeError::Authentication(_) => ApiError::unauthorized(err.to_string()),
            ComputeError::EndpointNotFound { .. }
            | ComputeError::Transport(_)
            | ComputeError::InvalidResponse(_) => {
                tracing::warn!(error = %err, "Compute backend unavailable");
                ApiError::bad_gateway(err.to_string())
            }
            ComputeError::UnknownBackend(_) | ComputeError::Misconfigured(_) => {
                tracing::error!(error = %err, "Compute backend misconfigured");
                ApiError::internal_error("The server has either erred or is incapable of performing the requested operation.")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self.into_body())).into_response()
    }
}
