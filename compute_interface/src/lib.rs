//! The seam between the HTTP adaptor and whatever compute service sits behind it.

use async_trait::async_trait;
use downcast_rs::{impl_downcast, DowncastSync};
use serde_json::Value;

pub use adaptor_shared_types::RequestContext;

pub type Result<T> = std::result::Result<T, ComputeError>;

#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Unknown compute backend: {0}")]
    UnknownBackend(String),

    #[error("Backend misconfigured: {0}")]
    Misconfigured(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("No {service_type} endpoint ({endpoint_type}) in service catalog")]
    EndpointNotFound {
        service_type: String,
        endpoint_type: String,
    },

    #[error("Compute backend returned {status}")]
    Upstream { status: u16, body: Value },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response from compute backend: {0}")]
    InvalidResponse(String),
}

/// Compute operations on the `servers` resource.
///
/// Bodies are passed through untouched; an implementation forwards them to
/// its backend and hands back whatever JSON the backend replied with.
#[async_trait]
pub trait ComputeApi: DowncastSync {
    /// Short name used in logs and the health endpoint.
    fn name(&self) -> &'static str;

    async fn list_servers(&self, ctx: &RequestContext) -> Result<Value>;

    async fn list_servers_detail(&self, ctx: &RequestContext) -> Result<Value>;

    async fn create_server(&self, ctx: &RequestContext, body: Value) -> Result<Value>;

    async fn get_server(&self, ctx: &RequestContext, id: &str) -> Result<Value>;

    async fn update_server(&self, ctx: &RequestContext, id: &str, body: Value) -> Result<Value>;

    async fn delete_server(&self, ctx: &RequestContext, id: &str) -> Result<()>;

    /// Run a server action (`reboot`, `resize`, ...) described by `body`.
    async fn server_action(&self, ctx: &RequestContext, id: &str, body: Value) -> Result<Value>;
}
impl_downcast!(sync ComputeApi);
