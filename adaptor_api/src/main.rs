// dalek Adaptor API Binary
//
// Loads the configuration, sets up logging and serves the adaptor.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use adaptor_api::{ApiServer, ApiState};
use adaptor_config::{AdaptorConfig, AuthStrategy, ConfigSource};
use observability::{init_tracing, TracingConfig};

#[derive(Parser)]
#[command(name = "dalek-api")]
#[command(version)]
#[command(about = "dalek - HTTP adaptor in front of OpenStack Nova", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file (falls back to $DALEK_CONFIG, then /etc/dalek/adaptor.toml)
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Address to listen on, overriding server.listen
    #[arg(long, env = "DALEK_LISTEN")]
    listen: Option<SocketAddr>,

    /// Auth pipeline (noauth, keystone or authcontext), overriding auth_strategy
    #[arg(long, env = "DALEK_AUTH_STRATEGY")]
    auth_strategy: Option<AuthStrategy>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = AdaptorConfig::resolve_path(cli.config_file);
    let (mut config, source) = AdaptorConfig::load_or_default(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    if let Some(strategy) = cli.auth_strategy {
        config.auth_strategy = strategy;
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(&TracingConfig::new(
        config.logging.filter.clone(),
        config.logging.json,
    ))
    .context("Failed to initialize logging")?;

    match &source {
        ConfigSource::File(path) => {
            tracing::debug!(path = %path.display(), "Loaded configuration file")
        }
        ConfigSource::Defaults => {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults")
        }
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        auth_strategy = %config.auth_strategy,
        compute_api_class = %config.compute_api_class,
        workers = config.server.workers,
        "Starting dalek API"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async move {
        let state = ApiState::from_config(&config).context("Failed to set up compute backend")?;
        ApiServer::new(config.server.listen, state).run().await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_strategy_flag() {
        let cli = Cli::try_parse_from(["dalek-api", "--auth-strategy", "keystone"]).unwrap();
        assert_eq!(cli.auth_strategy, Some(AuthStrategy::Keystone));
    }

    #[test]
    fn test_unknown_auth_strategy_flag_is_rejected() {
        assert!(Cli::try_parse_from(["dalek-api", "--auth-strategy", "basic"]).is_err());
    }
}
