//! API server state.

use std::sync::Arc;

use adaptor_config::AdaptorConfig;
use compute::{ComputeApi, ComputeError};

use crate::auth::AuthConfig;

/// Shared state for the API server.
#[derive(Clone)]
pub struct ApiState {
    /// Backend every `/servers` call is forwarded to.
    pub compute: Arc<dyn ComputeApi>,
    /// Authentication configuration.
    pub auth_config: Arc<AuthConfig>,
}

impl ApiState {
    /// Create new API state.
    pub fn new(compute: Arc<dyn ComputeApi>, auth_config: AuthConfig) -> Self {
        Self {
            compute,
            auth_config: Arc::new(auth_config),
        }
    }

    /// Resolve the compute backend and auth settings from configuration.
    pub fn from_config(config: &AdaptorConfig) -> Result<Self, ComputeError> {
        let compute = compute::api(config)?;
        Ok(Self::new(compute, AuthConfig::from_config(config)))
    }
}
