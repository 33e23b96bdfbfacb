//! Compute backends for the dalek adaptor.
//!
//! `api` resolves the configured `compute_api_class` to a backend:
//!
//! - `nova` / `dalek.compute.nova.API`: forwards to Nova through Keystone (default)
//! - `echo` / `dalek.compute.echo.API`: canned replies (requires the `echo` feature)

use std::sync::Arc;

use tracing::info;

use adaptor_config::AdaptorConfig;

pub mod keystone;
pub mod nova;

#[cfg(feature = "echo")]
pub mod echo;

// Re-export common types
pub use compute_interface::{ComputeApi, ComputeError, RequestContext, Result};

pub use nova::NovaComputeApi;

#[cfg(feature = "echo")]
pub use echo::EchoComputeApi;

/// Strip the legacy `dalek.compute.<name>.API` form down to `<name>`.
fn backend_key(class: &str) -> &str {
    let class = class.trim();
    class
        .strip_prefix("dalek.compute.")
        .and_then(|rest| rest.strip_suffix(".API"))
        .unwrap_or(class)
}

/// Build the compute backend named by `config.compute_api_class`.
pub fn api(config: &AdaptorConfig) -> Result<Arc<dyn ComputeApi>> {
    let api: Arc<dyn ComputeApi> = match backend_key(&config.compute_api_class) {
        "nova" => Arc::new(NovaComputeApi::new(&config.nova)?),
        #[cfg(feature = "echo")]
        "echo" => Arc::new(EchoComputeApi::new()),
        _ => {
            return Err(ComputeError::UnknownBackend(
                config.compute_api_class.clone(),
            ))
        }
    };

    info!(
        class = %config.compute_api_class,
        backend = api.name(),
        "Compute backend selected"
    );
    Ok(api)
}
