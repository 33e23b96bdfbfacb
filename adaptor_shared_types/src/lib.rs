//! Types shared across the adaptor crates.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Per-request identity stamped by the auth middleware.
///
/// A context lives for exactly one request. The password is the statically
/// configured `auth_password`; it is shared by every context and never shows
/// up in `Debug` output.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    user_password: SecretString,
}

impl RequestContext {
    pub fn new(
        user_id: Option<String>,
        user_name: Option<String>,
        user_password: SecretString,
    ) -> Self {
        Self {
            request_id: None,
            user_id,
            user_name,
            user_password,
        }
    }

    /// A context with no identity attached, as produced by the `noauth` pipeline.
    pub fn anonymous(user_password: SecretString) -> Self {
        Self::new(None, None, user_password)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none() && self.user_name.is_none()
    }

    pub fn user_password(&self) -> &str {
        self.user_password.expose_secret()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .field("user_password", &"[REDACTED]")
            .finish()
    }
}
