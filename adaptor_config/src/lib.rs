//! Configuration for the dalek compute adaptor.
//!
//! The configuration is a single TOML file. Every key has a default, so an
//! empty file (or a missing default file) yields a usable configuration that
//! talks to a local Keystone with the stock `admin` credentials.
//!
//! ```toml
//! auth_strategy = "authcontext"
//! compute_api_class = "dalek.compute.nova.API"
//!
//! [server]
//! listen = "0.0.0.0:8774"
//!
//! [nova]
//! auth_url = "http://10.20.0.7:5000/v2.0"
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Path used when neither `--config-file` nor `DALEK_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dalek/adaptor.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "DALEK_CONFIG";

/// Backend used when `compute_api_class` is not set.
pub const DEFAULT_COMPUTE_API_CLASS: &str = "dalek.compute.nova.API";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which auth pipeline fronts the `/servers` routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// Ignore identity headers and stamp an anonymous context.
    NoAuth,
    /// Trust identity headers set by an upstream Keystone middleware and
    /// reject requests that carry none.
    Keystone,
    /// Stamp whatever identity headers are present.
    #[default]
    AuthContext,
}

impl AuthStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStrategy::NoAuth => "noauth",
            AuthStrategy::Keystone => "keystone",
            AuthStrategy::AuthContext => "authcontext",
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "noauth" => Ok(AuthStrategy::NoAuth),
            "keystone" => Ok(AuthStrategy::Keystone),
            "authcontext" => Ok(AuthStrategy::AuthContext),
            other => Err(ConfigError::Invalid(format!(
                "unknown auth_strategy '{}', expected noauth, keystone or authcontext",
                other
            ))),
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The default file was absent; built-in defaults are in effect.
    Defaults,
}

/// Top-level adaptor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdaptorConfig {
    pub auth_strategy: AuthStrategy,
    /// Password stamped onto every request context.
    #[serde(deserialize_with = "deserialize_secret")]
    pub auth_password: SecretString,
    /// Name of the compute backend; see `compute::api`.
    pub compute_api_class: String,
    pub server: ServerConfig,
    pub nova: NovaConfig,
    pub logging: LoggingConfig,
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self {
            auth_strategy: AuthStrategy::default(),
            auth_password: SecretString::new("auth_password".to_string()),
            compute_api_class: DEFAULT_COMPUTE_API_CLASS.to_string(),
            server: ServerConfig::default(),
            nova: NovaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Number of tokio worker threads.
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8774)),
            workers: 1,
        }
    }
}

/// Keystone v2.0 credentials and catalog lookup for the Nova backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NovaConfig {
    pub auth_url: String,
    /// Service credentials, used when a request carries no user name.
    pub username: String,
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,
    pub tenant_name: String,
    pub service_type: String,
    pub endpoint_type: String,
    pub region_name: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NovaConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://127.0.0.1:5000/v2.0".to_string(),
            username: "admin".to_string(),
            password: SecretString::new("admin".to_string()),
            tenant_name: "admin".to_string(),
            service_type: "compute".to_string(),
            endpoint_type: "publicURL".to_string(),
            region_name: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,tower_http=warn".to_string(),
            json: false,
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::new)
}

impl AdaptorConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AdaptorConfig = toml::from_str(raw)?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load configuration, falling back to defaults when `path` is the
    /// default location and does not exist. An explicitly given file must exist.
    ///
    /// Runs before logging is set up, so the caller reports the returned
    /// [`ConfigSource`].
    pub fn load_or_default(path: &Path) -> Result<(Self, ConfigSource)> {
        Self::load_with_fallback(path, Path::new(DEFAULT_CONFIG_PATH))
    }

    fn load_with_fallback(path: &Path, default_path: &Path) -> Result<(Self, ConfigSource)> {
        if path == default_path && !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults));
        }
        let config = Self::load(path)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Pick the config file: explicit argument, then `DALEK_CONFIG`, then the default.
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.workers == 0 {
            return Err(ConfigError::Invalid(
                "server.workers must be at least 1".to_string(),
            ));
        }
        if self.compute_api_class.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "compute_api_class cannot be empty".to_string(),
            ));
        }
        if self.nova.auth_url.trim().is_empty() {
            return Err(ConfigError::Invalid("nova.auth_url cannot be empty".to_string()));
        }
        if self.nova.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "nova.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
