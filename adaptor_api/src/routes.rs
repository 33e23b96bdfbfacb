//! Router: maps HTTP verbs on the `servers` resource to the controller.
//!
//! ```text
//! GET    /servers               index
//! GET    /servers/detail        detail
//! POST   /servers               create   (202)
//! GET    /servers/:id           show
//! PUT    /servers/:id           update
//! DELETE /servers/:id           delete   (204)
//! POST   /servers/:id/action    action   (202)
//! GET    /health                health   (no auth)
//! ```

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;
use uuid::Uuid;

use crate::auth;
use crate::handlers;
use crate::state::ApiState;

/// Generates OpenStack-style `req-<uuid>` ids for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeOpenStackRequestId;

impl MakeRequestId for MakeOpenStackRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = format!("req-{}", Uuid::new_v4());
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// Build the adaptor router.
pub fn create_router(state: ApiState) -> Router {
    let servers = Router::new()
        .route("/servers", get(handlers::index).post(handlers::create))
        .route("/servers/detail", get(handlers::detail))
        .route(
            "/servers/:id",
            get(handlers::show)
                .put(handlers::update)
                .delete(handlers::delete),
        )
        .route("/servers/:id/action", post(handlers::action))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::context_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(servers)
        .with_state(state)
        // Outermost first: assign the id, trace with it, echo it back.
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeOpenStackRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
