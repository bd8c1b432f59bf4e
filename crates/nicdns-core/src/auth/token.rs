// # OAuth2 Token
//
// Bearer token as returned by `POST /oauth/token`:
//
// ```json
// {
//   "access_token": "...",
//   "token_type": "Bearer",
//   "expires_in": 14400,
//   "refresh_token": "..."
// }
// ```
//
// `expires_at` is not sent by the server; it is stamped on receipt so that a
// persisted token can be judged after a restart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens this close to expiry are treated as expired
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

/// OAuth2 bearer token
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer value
    /// ⚠️ NEVER log this value
    pub access_token: String,

    /// Token type, normally `Bearer`
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime in seconds as reported by the server
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Refresh token (only issued when offline access was requested)
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Granted scope
    #[serde(default)]
    pub scope: Option<String>,

    /// Absolute expiry
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Create a bearer token without expiry information
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_in: None,
            refresh_token: None,
            scope: None,
            expires_at: None,
        }
    }

    /// Set the refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set the absolute expiry
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Parse a token endpoint response body, stamping `expires_at` if absent
    pub fn from_response(body: &str) -> Result<Self, crate::Error> {
        let mut token: Token = serde_json::from_str(body)?;
        if token.access_token.is_empty() {
            return Err(crate::Error::auth("token endpoint returned an empty access_token"));
        }
        if token.expires_at.is_none() {
            if let Some(secs) = token.expires_in {
                token.expires_at = expiry_after(Utc::now(), secs);
                if token.expires_at.is_none() {
                    tracing::warn!("expires_in {} is out of range, treating token as non-expiring", secs);
                }
            }
        }
        Ok(token)
    }

    /// Whether the token is expired at `now` (with leeway)
    ///
    /// A token without expiry information is never considered expired; the
    /// server's 401 is the only signal in that case.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_LEEWAY_SECS) >= expires_at,
            None => false,
        }
    }

    /// Whether the token is expired now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether a refresh-token exchange is possible
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<REDACTED>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// `now + secs`, or `None` when it does not fit in a timestamp
fn expiry_after(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    now.checked_add_signed(Duration::try_seconds(secs)?)
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Error body of the token endpoint (RFC 6749 §5.2)
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl OAuthErrorBody {
    pub(crate) fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    pub(crate) fn message(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error.clone(),
        }
    }
}
