//! Backend that answers every call locally with a canned body.
//!
//! Useful for wiring checks and for running the adaptor without a Nova
//! deployment behind it.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use compute_interface::{ComputeApi, RequestContext, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct EchoComputeApi;

impl EchoComputeApi {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ComputeApi for EchoComputeApi {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn list_servers(&self, _ctx: &RequestContext) -> Result<Value> {
        Ok(json!({ "index": "success" }))
    }

    async fn list_servers_detail(&self, _ctx: &RequestContext) -> Result<Value> {
        Ok(json!({ "detail": "success" }))
    }

    async fn create_server(&self, ctx: &RequestContext, body: Value) -> Result<Value> {
        debug!(user = ?ctx.user_name, "Echoing server create");
        Ok(json!({ "create": "success", "body": body }))
    }

    async fn get_server(&self, _ctx: &RequestContext, id: &str) -> Result<Value> {
        Ok(json!({ "show": "success", "id": id }))
    }

    async fn update_server(&self, _ctx: &RequestContext, id: &str, body: Value) -> Result<Value> {
        Ok(json!({ "update": "success", "id": id, "body": body }))
    }

    async fn delete_server(&self, _ctx: &RequestContext, id: &str) -> Result<()> {
        debug!(id, "Echoing server delete");
        Ok(())
    }

    async fn server_action(&self, _ctx: &RequestContext, id: &str, body: Value) -> Result<Value> {
        Ok(json!({ "action": "success", "id": id, "body": body }))
    }
}
