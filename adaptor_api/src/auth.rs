//! Auth middleware: turns identity headers into a `RequestContext`.
//!
//! The pipeline is chosen by `auth_strategy`:
//!
//! - `authcontext`: stamp whatever identity headers are present
//! - `keystone`: identity headers are mandatory; an upstream Keystone
//!   middleware is trusted to have validated the token and set them
//! - `noauth`: headers are ignored and an anonymous context is stamped
//!
//! Every context carries the configured `auth_password`.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use secrecy::SecretString;
use tracing::debug;

use adaptor_config::{AdaptorConfig, AuthStrategy};
use adaptor_shared_types::RequestContext;

use crate::error::ApiError;
use crate::state::ApiState;

/// Keystone sets `X-User-Id`; WSGI-era deployments spell it `X_USER_ID`.
const USER_ID_HEADERS: [&str; 2] = ["x-user-id", "x_user_id"];
const USER_NAME_HEADERS: [&str; 2] = ["x-user-name", "x_user_name"];
const IDENTITY_STATUS_HEADER: &str = "x-identity-status";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authentication settings used by the middleware.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub strategy: AuthStrategy,
    password: SecretString,
}

impl AuthConfig {
    pub fn new(strategy: AuthStrategy, password: SecretString) -> Self {
        Self { strategy, password }
    }

    pub fn from_config(config: &AdaptorConfig) -> Self {
        Self::new(config.auth_strategy, config.auth_password.clone())
    }

    /// Build the context for a request, or reject it.
    pub fn context_for(&self, headers: &HeaderMap) -> Result<RequestContext, ApiError> {
        let mut ctx = match self.strategy {
            AuthStrategy::NoAuth => RequestContext::anonymous(self.password.clone()),
            AuthStrategy::AuthContext => self.context_from_headers(headers),
            AuthStrategy::Keystone => {
                if first_header(headers, &[IDENTITY_STATUS_HEADER])
                    .is_some_and(|status| status.eq_ignore_ascii_case("invalid"))
                {
                    return Err(ApiError::unauthorized("Identity status is invalid"));
                }
                let ctx = self.context_from_headers(headers);
                if ctx.user_id.is_none() {
                    return Err(ApiError::unauthorized("Missing user identity"));
                }
                ctx
            }
        };

        if let Some(request_id) = first_header(headers, &[REQUEST_ID_HEADER]) {
            ctx = ctx.with_request_id(request_id);
        }
        Ok(ctx)
    }

    fn context_from_headers(&self, headers: &HeaderMap) -> RequestContext {
        RequestContext::new(
            first_header(headers, &USER_ID_HEADERS).map(str::to_string),
            first_header(headers, &USER_NAME_HEADERS).map(str::to_string),
            self.password.clone(),
        )
    }
}

/// First non-empty value among `names`.
fn first_header<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Stamp a `RequestContext` into the request extensions.
pub async fn context_middleware(
    State(state): State<ApiState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = state.auth_config.context_for(req.headers())?;
    debug!(
        strategy = %state.auth_config.strategy,
        user_id = ctx.user_id.as_deref().unwrap_or("-"),
        user_name = ctx.user_name.as_deref().unwrap_or("-"),
        "Request context stamped"
    );

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue, StatusCode};

    fn auth(strategy: AuthStrategy) -> AuthConfig {
        AuthConfig::new(strategy, SecretString::new("auth_password".to_string()))
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_authcontext_reads_headers() {
        let ctx = auth(AuthStrategy::AuthContext)
            .context_for(&headers(&[("x-user-id", "u-1"), ("x-user-name", "alice")]))
            .unwrap();

        assert_eq!(ctx.user_id.as_deref(), Some("u-1"));
        assert_eq!(ctx.user_name.as_deref(), Some("alice"));
        assert_eq!(ctx.user_password(), "auth_password");
    }

    #[test]
    fn test_authcontext_accepts_underscore_headers() {
        let ctx = auth(AuthStrategy::AuthContext)
            .context_for(&headers(&[("x_user_id", "u-2"), ("x_user_name", "bob")]))
            .unwrap();

        assert_eq!(ctx.user_id.as_deref(), Some("u-2"));
        assert_eq!(ctx.user_name.as_deref(), Some("bob"));
    }

    #[test]
    fn test_authcontext_allows_missing_identity() {
        let ctx = auth(AuthStrategy::AuthContext)
            .context_for(&HeaderMap::new())
            .unwrap();
        assert!(ctx.is_anonymous());
    }

    #[test]
    fn test_empty_header_counts_as_missing() {
        let ctx = auth(AuthStrategy::AuthContext)
            .context_for(&headers(&[("x-user-id", ""), ("x_user_id", "u-3")]))
            .unwrap();
        assert_eq!(ctx.user_id.as_deref(), Some("u-3"));
    }

    #[test]
    fn test_keystone_requires_user_id() {
        let err = auth(AuthStrategy::Keystone)
            .context_for(&headers(&[("x-user-name", "alice")]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_keystone_rejects_invalid_identity_status() {
        let err = auth(AuthStrategy::Keystone)
            .context_for(&headers(&[
                ("x-user-id", "u-1"),
                ("x-identity-status", "Invalid"),
            ]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_noauth_ignores_headers() {
        let ctx = auth(AuthStrategy::NoAuth)
            .context_for(&headers(&[("x-user-id", "u-1"), ("x-request-id", "req-7")]))
            .unwrap();

        assert!(ctx.is_anonymous());
        assert_eq!(ctx.request_id.as_deref(), Some("req-7"));
        assert_eq!(ctx.user_password(), "auth_password");
    }
}
