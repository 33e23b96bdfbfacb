//! Nova v2 backend.
//!
//! Every call authenticates through Keystone (cached), then forwards the
//! request body unchanged to the compute endpoint from the service catalog.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use adaptor_config::NovaConfig;
use compute_interface::{ComputeApi, ComputeError, RequestContext, Result};

use crate::keystone::{Credentials, KeystoneClient};

const REQUEST_ID_HEADER: &str = "X-OpenStack-Request-ID";

pub struct NovaComputeApi {
    http: reqwest::Client,
    keystone: KeystoneClient,
    service_username: String,
    service_password: SecretString,
}

impl NovaComputeApi {
    pub fn new(config: &NovaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ComputeError::Misconfigured(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            keystone: KeystoneClient::new(http.clone(), config),
            http,
            service_username: config.username.clone(),
            service_password: config.password.clone(),
        })
    }

    /// Users named in the context authenticate as themselves with the shared
    /// adaptor password; anonymous requests use the service account.
    fn credentials<'a>(&'a self, ctx: &'a RequestContext) -> Credentials<'a> {
        match ctx.user_name.as_deref() {
            Some(username) => Credentials {
                username,
                password: ctx.user_password(),
            },
            None => Credentials {
                username: &self.service_username,
                password: self.service_password.expose_secret(),
            },
        }
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<Value> {
        let creds = self.credentials(ctx);
        let mut retried = false;

        loop {
            let token = self.keystone.token(creds).await?;
            let url = endpoint_url(&token.endpoint, segments)?;

            debug!(
                method = %method,
                %url,
                user = creds.username,
                request_id = ctx.request_id.as_deref().unwrap_or("-"),
                "Forwarding to Nova"
            );

            let mut request = self
                .http
                .request(method.clone(), url)
                .header("X-Auth-Token", &token.id)
                .header(header::ACCEPT, "application/json");
            if let Some(request_id) = &ctx.request_id {
                request = request.header(REQUEST_ID_HEADER, request_id);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ComputeError::Transport(format!("Nova request failed: {e}")))?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !retried {
                warn!(user = creds.username, "Nova rejected token, re-authenticating");
                self.keystone.invalidate(creds).await;
                retried = true;
                continue;
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| ComputeError::Transport(format!("Reading Nova reply: {e}")))?;

            if !status.is_success() {
                let body = serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
                return Err(ComputeError::Upstream {
                    status: status.as_u16(),
                    body,
                });
            }

            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes)
                .map_err(|e| ComputeError::InvalidResponse(format!("Nova reply is not JSON: {e}")));
        }
    }
}

/// Append path segments to the catalog endpoint, percent-encoding each one.
fn endpoint_url(endpoint: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| ComputeError::Misconfigured(format!("Bad compute endpoint '{endpoint}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ComputeError::Misconfigured(format!("Compute endpoint '{endpoint}' cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl ComputeApi for NovaComputeApi {
    fn name(&self) -> &'static str {
        "nova"
    }

    async fn list_servers(&self, ctx: &RequestContext) -> Result<Value> {
        self.send(ctx, Method::GET, &["servers"], None).await
    }

    async fn list_servers_detail(&self, ctx: &RequestContext) -> Result<Value> {
        self.send(ctx, Method::GET, &["servers", "detail"], None).await
    }

    async fn create_server(&self, ctx: &RequestContext, body: Value) -> Result<Value> {
        self.send(ctx, Method::POST, &["servers"], Some(&body)).await
    }

    async fn get_server(&self, ctx: &RequestContext, id: &str) -> Result<Value> {
        self.send(ctx, Method::GET, &["servers", id], None).await
    }

    async fn update_server(&self, ctx: &RequestContext, id: &str, body: Value) -> Result<Value> {
        self.send(ctx, Method::PUT, &["servers", id], Some(&body)).await
    }

    async fn delete_server(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        self.send(ctx, Method::DELETE, &["servers", id], None).await?;
        Ok(())
    }

    async fn server_action(&self, ctx: &RequestContext, id: &str, body: Value) -> Result<Value> {
        self.send(ctx, Method::POST, &["servers", id, "action"], Some(&body))
            .await
    }
}
