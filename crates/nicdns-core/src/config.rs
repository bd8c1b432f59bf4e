//! Configuration types for the NIC.RU client
//!
//! [`NicConfig`] carries the OAuth2 application credentials, the account
//! credentials used for the password grant, and the defaults applied to
//! service/zone arguments.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.nic.ru";

/// Main client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct NicConfig {
    /// OAuth2 application id
    pub client_id: String,

    /// OAuth2 application secret
    /// ⚠️ NEVER log this value
    pub client_secret: String,

    /// Account login for the password grant
    #[serde(default)]
    pub username: Option<String>,

    /// Account password for the password grant
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub password: Option<String>,

    /// Requested OAuth2 scope (e.g. `.+:/dns-master/.+`)
    #[serde(default)]
    pub scope: Option<String>,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Lifetime of offline access in seconds; a refresh token is only issued when > 0
    #[serde(default = "default_offline")]
    pub offline: u64,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Service used when a call does not name one
    #[serde(default)]
    pub default_service: Option<String>,

    /// Zone used when a call does not name one
    #[serde(default)]
    pub default_zone: Option<String>,

    /// Where to persist the token between runs (file token store)
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

impl NicConfig {
    /// Create a configuration with defaults for everything but the application credentials
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: None,
            password: None,
            scope: None,
            base_url: default_base_url(),
            offline: default_offline(),
            timeout_secs: default_timeout_secs(),
            default_service: None,
            default_zone: None,
            token_path: None,
        }
    }

    /// Set account credentials for the password grant
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the OAuth2 scope
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set default service and zone
    pub fn with_defaults(
        mut self,
        service: Option<String>,
        zone: Option<String>,
    ) -> Self {
        self.default_service = service;
        self.default_zone = zone;
        self
    }

    /// Whether username and password are both present
    pub fn has_password_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Token endpoint URL
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url.trim_end_matches('/'))
    }

    /// URL of a DNS-master resource path (must start with `/`)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/dns-master{}", self.base_url.trim_end_matches('/'), path)
    }

    /// HTTP timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.client_id.is_empty() {
            return Err(crate::Error::config("client_id cannot be empty"));
        }
        if self.client_secret.is_empty() {
            return Err(crate::Error::config("client_secret cannot be empty"));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(crate::Error::config(
                "username and password must be set together",
            ));
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(crate::Error::config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("timeout_secs must be > 0"));
        }
        Ok(())
    }
}

// Custom Debug implementation that hides secrets
impl std::fmt::Debug for NicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NicConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("scope", &self.scope)
            .field("base_url", &self.base_url)
            .field("offline", &self.offline)
            .field("timeout_secs", &self.timeout_secs)
            .field("default_service", &self.default_service)
            .field("default_zone", &self.default_zone)
            .field("token_path", &self.token_path)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_offline() -> u64 {
    3600
}

fn default_timeout_secs() -> u64 {
    600
}
