//! Keystone v2.0 password authentication and service catalog lookup.
//!
//! Tokens are cached per credential pair (user name plus a digest of the
//! password) together with the endpoint picked from the catalog, and reused
//! until shortly before they expire.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use adaptor_config::NovaConfig;
use compute_interface::{ComputeError, Result};

/// A token is treated as expired this long before Keystone says it is.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Username/password pair presented to Keystone.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl Credentials<'_> {
    /// Cache slot for these credentials. Two callers share a token only when
    /// both the user name and the password match.
    fn cache_key(&self) -> String {
        let digest = Sha256::digest(self.password.as_bytes());
        format!("{}:{}", self.username, hex::encode(digest))
    }
}

/// A scoped token and the compute endpoint it unlocks.
#[derive(Debug, Clone)]
pub struct ScopedToken {
    pub id: String,
    pub endpoint: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ScopedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) > now,
            // Without an expiry the token lives until Nova rejects it.
            None => true,
        }
    }
}

#[derive(Serialize)]
struct AuthRequestRoot<'a> {
    auth: AuthRequest<'a>,
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    #[serde(rename = "passwordCredentials")]
    password_credentials: PasswordCredentials<'a>,
    #[serde(rename = "tenantName")]
    tenant_name: &'a str,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessRoot {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
    expires: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    region: Option<String>,
    /// `publicURL`, `internalURL`, `adminURL` and whatever else the deployment adds.
    #[serde(flatten)]
    urls: HashMap<String, Value>,
}

/// Client for the Keystone v2.0 `tokens` API.
pub struct KeystoneClient {
    http: reqwest::Client,
    auth_url: String,
    tenant_name: String,
    service_type: String,
    endpoint_type: String,
    region_name: Option<String>,
    tokens: RwLock<HashMap<String, ScopedToken>>,
}

impl KeystoneClient {
    pub fn new(http: reqwest::Client, config: &NovaConfig) -> Self {
        Self {
            http,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            tenant_name: config.tenant_name.clone(),
            service_type: config.service_type.clone(),
            endpoint_type: config.endpoint_type.clone(),
            region_name: config.region_name.clone(),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Return a fresh token for `creds`, authenticating if the cached one is
    /// missing or about to expire.
    pub async fn token(&self, creds: Credentials<'_>) -> Result<ScopedToken> {
        let key = creds.cache_key();
        {
            let tokens = self.tokens.read().await;
            if let Some(token) = tokens.get(&key) {
                if token.is_fresh(Utc::now()) {
                    return Ok(token.clone());
                }
            }
        }

        let token = self.authenticate(creds).await?;
        self.tokens.write().await.insert(key, token.clone());
        Ok(token)
    }

    /// Drop the cached token for `creds`, e.g. after Nova answered 401.
    pub async fn invalidate(&self, creds: Credentials<'_>) {
        if self.tokens.write().await.remove(&creds.cache_key()).is_some() {
            debug!(user = creds.username, "Invalidated cached Keystone token");
        }
    }

    async fn authenticate(&self, creds: Credentials<'_>) -> Result<ScopedToken> {
        let url = format!("{}/tokens", self.auth_url);
        debug!(user = creds.username, tenant = %self.tenant_name, %url, "Requesting Keystone token");

        let body = AuthRequestRoot {
            auth: AuthRequest {
                password_credentials: PasswordCredentials {
                    username: creds.username,
                    password: creds.password,
                },
                tenant_name: &self.tenant_name,
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ComputeError::Transport(format!("Keystone request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(user = creds.username, %status, "Keystone rejected credentials");
            return Err(ComputeError::Authentication(format!(
                "Keystone rejected credentials for user '{}'",
                creds.username
            )));
        }
        if !status.is_success() {
            return Err(ComputeError::Transport(format!(
                "Keystone returned {status}"
            )));
        }

        let root: AccessRoot = response
            .json()
            .await
            .map_err(|e| ComputeError::InvalidResponse(format!("Keystone token reply: {e}")))?;

        let endpoint = self.select_endpoint(&root.access.service_catalog)?;
        let expires_at = root.access.token.expires.as_deref().and_then(parse_expiry);

        info!(user = creds.username, %endpoint, "Authenticated against Keystone");

        Ok(ScopedToken {
            id: root.access.token.id,
            endpoint,
            expires_at,
        })
    }

    fn select_endpoint(&self, catalog: &[CatalogEntry]) -> Result<String> {
        catalog
            .iter()
            .filter(|entry| entry.service_type == self.service_type)
            .flat_map(|entry| entry.endpoints.iter())
            .filter(|endpoint| match &self.region_name {
                Some(region) => endpoint.region.as_deref() == Some(region.as_str()),
                None => true,
            })
            .find_map(|endpoint| endpoint.urls.get(&self.endpoint_type)?.as_str())
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| ComputeError::EndpointNotFound {
                service_type: self.service_type.clone(),
                endpoint_type: self.endpoint_type.clone(),
            })
    }
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!(expires = raw, error = %e, "Unparseable token expiry, caching without one");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(region: Option<&str>) -> KeystoneClient {
        let config = NovaConfig {
            region_name: region.map(str::to_string),
            ..NovaConfig::default()
        };
        KeystoneClient::new(reqwest::Client::new(), &config)
    }

    fn catalog() -> Vec<CatalogEntry> {
        let raw = json!([
            {
                "type": "image",
                "endpoints": [{ "region": "RegionOne", "publicURL": "http://glance:9292" }]
            },
            {
                "type": "compute",
                "endpoints": [
                    {
                        "region": "RegionOne",
                        "publicURL": "http://nova-one:8774/v2/t1/",
                        "internalURL": "http://nova-one-int:8774/v2/t1"
                    },
                    {
                        "region": "RegionTwo",
                        "publicURL": "http://nova-two:8774/v2/t1"
                    }
                ]
            }
        ]);
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_select_first_public_endpoint() {
        let endpoint = client(None).select_endpoint(&catalog()).unwrap();
        assert_eq!(endpoint, "http://nova-one:8774/v2/t1");
    }

    #[test]
    fn test_select_endpoint_by_region() {
        let endpoint = client(Some("RegionTwo")).select_endpoint(&catalog()).unwrap();
        assert_eq!(endpoint, "http://nova-two:8774/v2/t1");
    }

    #[test]
    fn test_select_internal_endpoint() {
        let mut keystone = client(None);
        keystone.endpoint_type = "internalURL".to_string();
        let endpoint = keystone.select_endpoint(&catalog()).unwrap();
        assert_eq!(endpoint, "http://nova-one-int:8774/v2/t1");
    }

    #[test]
    fn test_missing_endpoint() {
        let err = client(Some("RegionThree"))
            .select_endpoint(&catalog())
            .unwrap_err();
        assert!(matches!(err, ComputeError::EndpointNotFound { .. }));
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        let token = |expires_at| ScopedToken {
            id: "t".to_string(),
            endpoint: "http://nova".to_string(),
            expires_at,
        };

        assert!(token(None).is_fresh(now));
        assert!(token(Some(now + chrono::Duration::hours(1))).is_fresh(now));
        assert!(!token(Some(now + chrono::Duration::seconds(10))).is_fresh(now));
        assert!(!token(Some(now - chrono::Duration::hours(1))).is_fresh(now));
    }

    #[test]
    fn test_cache_key_covers_password() {
        let service = Credentials {
            username: "admin",
            password: "admin",
        };
        let claimed = Credentials {
            username: "admin",
            password: "auth_password",
        };

        assert_eq!(service.cache_key(), service.cache_key());
        assert_ne!(service.cache_key(), claimed.cache_key());
        assert!(!service.cache_key().contains("admin:admin"));
    }

    #[test]
    fn test_parse_expiry() {
        assert!(parse_expiry("2015-02-05T00:03:41Z").is_some());
        assert!(parse_expiry("yesterday").is_none());
    }

    #[test]
    fn test_request_body_shape() {
        let body = AuthRequestRoot {
            auth: AuthRequest {
                password_credentials: PasswordCredentials {
                    username: "admin",
                    password: "secret",
                },
                tenant_name: "admin",
            },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "auth": {
                    "passwordCredentials": { "username": "admin", "password": "secret" },
                    "tenantName": "admin"
                }
            })
        );
    }
}
