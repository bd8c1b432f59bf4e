// # Token Manager
//
// Owns the OAuth2 bearer token shared by every API call.
//
// ## Grants
//
// ```http
// POST /oauth/token
// Content-Type: application/x-www-form-urlencoded
//
// grant_type=password&username=...&password=...&scope=...
//     &client_id=...&client_secret=...&offline=3600
//
// grant_type=refresh_token&refresh_token=...
//     &client_id=...&client_secret=...&offline=3600
// ```
//
// ## Lifecycle
//
// - `valid_token()` is called before every authenticated request. A token
//   past its expiry is refreshed (refresh grant), or re-acquired (password
//   grant) when no refresh token is usable.
// - `force_refresh()` is called once when the server rejects a token with 401.
//   The client retries its call exactly once with the new token.
// - Every newly obtained token goes to the token store, then to the
//   token-updater callback. Tokens injected with `set_token`/`restore` do not.
//
// ## Security
//
// Tokens, refresh tokens, the client secret and the password never reach the logs.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::auth::token::{OAuthErrorBody, Token};
use crate::config::NicConfig;
use crate::traits::{Body, HttpRequest, Method, TokenStore, Transport};
use crate::{Error, Result};

/// Callback invoked with every newly obtained token
pub type TokenUpdater = Arc<dyn Fn(&Token) + Send + Sync>;

/// OAuth2 token lifecycle manager
pub struct TokenManager {
    config: Arc<NicConfig>,
    transport: Arc<dyn Transport>,
    token: RwLock<Option<Token>>,
    // Held while talking to the token endpoint so concurrent callers share one exchange
    exchange_lock: Mutex<()>,
    store: Option<Arc<dyn TokenStore>>,
    updater: Option<TokenUpdater>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.config.token_url())
            .field("transport", &self.transport.name())
            .field("store", &self.store.as_ref().map(|s| s.store_name()))
            .field("updater", &self.updater.is_some())
            .finish()
    }
}

impl TokenManager {
    /// Create a manager without a token
    pub fn new(config: Arc<NicConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            token: RwLock::new(None),
            exchange_lock: Mutex::new(()),
            store: None,
            updater: None,
        }
    }

    /// Start from a previously obtained token
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = RwLock::new(Some(token));
        self
    }

    /// Persist every new token to `store`
    pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Invoke `updater` with every new token
    pub fn with_updater<F>(mut self, updater: F) -> Self
    where
        F: Fn(&Token) + Send + Sync + 'static,
    {
        self.updater = Some(Arc::new(updater));
        self
    }

    /// Current token, valid or not
    pub async fn current_token(&self) -> Option<Token> {
        self.token.read().await.clone()
    }

    /// Replace the current token without invoking the updater
    pub async fn set_token(&self, token: Token) {
        *self.token.write().await = Some(token);
    }

    /// Load the token saved in the store
    ///
    /// Returns `true` if a token was restored.
    pub async fn restore(&self) -> Result<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };

        match store.load().await? {
            Some(token) => {
                tracing::debug!(
                    "Restored token from {} store (expires at {:?})",
                    store.store_name(),
                    token.expires_at
                );
                self.set_token(token).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Obtain a token with the resource-owner password grant
    pub async fn fetch_token(&self) -> Result<Token> {
        let _guard = self.exchange_lock.lock().await;
        self.password_grant().await
    }

    /// Exchange the current refresh token for a new token
    pub async fn refresh_token(&self) -> Result<Token> {
        let _guard = self.exchange_lock.lock().await;
        let current = self.current_token().await;
        match current {
            Some(token) if token.can_refresh() => self.refresh_grant(&token).await,
            _ => Err(Error::auth("no refresh token available")),
        }
    }

    /// Access token to put in the `Authorization` header
    ///
    /// Refreshes or re-acquires the token first when it is expired.
    pub async fn valid_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        let _guard = self.exchange_lock.lock().await;

        // Another task may have renewed it while we waited
        let current = self.current_token().await;
        if let Some(token) = &current {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
            tracing::debug!("Access token expired at {:?}", token.expires_at);
        }

        self.renew(current.as_ref()).await.map(|t| t.access_token)
    }

    /// Renew after the server rejected `rejected` with 401
    ///
    /// If the current token already differs from `rejected` and is still
    /// valid, another task has renewed it and it is returned as is.
    pub async fn force_refresh(&self, rejected: &str) -> Result<String> {
        let _guard = self.exchange_lock.lock().await;

        let current = self.current_token().await;
        if let Some(token) = &current {
            if token.access_token != rejected && !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        tracing::warn!("Access token rejected by server, renewing");
        self.renew(current.as_ref()).await.map(|t| t.access_token)
    }

    // Caller holds exchange_lock
    async fn renew(&self, current: Option<&Token>) -> Result<Token> {
        if let Some(token) = current.filter(|t| t.can_refresh()) {
            match self.refresh_grant(token).await {
                Ok(token) => return Ok(token),
                Err(e) if e.is_auth() && self.config.has_password_credentials() => {
                    tracing::warn!("Refresh token rejected ({}), falling back to password grant", e);
                }
                Err(e) => return Err(e),
            }
        }

        if self.config.has_password_credentials() {
            return self.password_grant().await;
        }

        Err(match current {
            Some(_) => Error::auth(
                "token expired and neither a refresh token nor password credentials are available",
            ),
            None => Error::auth("no token available and no password credentials configured"),
        })
    }

    async fn password_grant(&self) -> Result<Token> {
        let (Some(username), Some(password)) = (&self.config.username, &self.config.password)
        else {
            return Err(Error::config(
                "username and password are required for the password grant",
            ));
        };

        tracing::debug!("Requesting token with password grant for {}", username);

        let mut fields = vec![
            ("grant_type".to_string(), "password".to_string()),
            ("username".to_string(), username.clone()),
            ("password".to_string(), password.clone()),
        ];
        if let Some(scope) = &self.config.scope {
            fields.push(("scope".to_string(), scope.clone()));
        }

        let token = self.exchange(fields).await?;
        self.accept(token).await
    }

    async fn refresh_grant(&self, current: &Token) -> Result<Token> {
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| Error::auth("no refresh token available"))?;

        tracing::debug!("Requesting token with refresh grant");

        let fields = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.clone()),
        ];

        let mut token = self.exchange(fields).await?;
        // RFC 6749 §6: the old refresh token stays valid if none is returned
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token);
        }
        self.accept(token).await
    }

    async fn exchange(&self, mut fields: Vec<(String, String)>) -> Result<Token> {
        fields.push(("client_id".to_string(), self.config.client_id.clone()));
        fields.push(("client_secret".to_string(), self.config.client_secret.clone()));
        fields.push(("offline".to_string(), self.config.offline.to_string()));

        let request =
            HttpRequest::new(Method::Post, self.config.token_url()).with_body(Body::Form(fields));
        let response = self.transport.execute(request).await?;

        if let Some(err) = OAuthErrorBody::parse(&response.body) {
            return Err(Error::auth(err.message()));
        }

        if !response.is_success() {
            return match response.status {
                400 | 401 | 403 => Err(Error::auth(format!(
                    "token endpoint returned status {}",
                    response.status
                ))),
                status => Err(Error::http(status, response.body)),
            };
        }

        Token::from_response(&response.body).map_err(|e| match e {
            Error::Json(e) => Error::invalid_response(format!("malformed token response: {}", e)),
            other => other,
        })
    }

    async fn accept(&self, token: Token) -> Result<Token> {
        *self.token.write().await = Some(token.clone());

        tracing::info!("Obtained new access token (expires at {:?})", token.expires_at);

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&token).await {
                tracing::warn!("Failed to save token to {} store: {}", store.store_name(), e);
            }
        }

        if let Some(updater) = &self.updater {
            updater(&token);
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;
    use crate::traits::HttpResponse;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Token endpoint double answering from a queue
    struct TokenEndpoint {
        responses: std::sync::Mutex<VecDeque<HttpResponse>>,
        requests: std::sync::Mutex<Vec<HttpRequest>>,
    }

    impl TokenEndpoint {
        fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: std::sync::Mutex::new(responses.into()),
                requests: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn grants(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.form_field("grant_type").unwrap_or_default().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for TokenEndpoint {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::transport("no scripted response"))
        }

        fn name(&self) -> &'static str {
            "token-endpoint"
        }
    }

    fn token_json(access: &str, refresh: Option<&str>) -> HttpResponse {
        let body = match refresh {
            Some(r) => format!(
                r#"{{"access_token":"{}","token_type":"Bearer","expires_in":3600,"refresh_token":"{}"}}"#,
                access, r
            ),
            None => format!(
                r#"{{"access_token":"{}","token_type":"Bearer","expires_in":3600}}"#,
                access
            ),
        };
        HttpResponse::new(200, body)
    }

    fn config() -> Arc<NicConfig> {
        Arc::new(
            NicConfig::new("app", "secret")
                .with_credentials("123/NIC-D", "pass")
                .with_scope(".+:/dns-master/.+"),
        )
    }

    fn expired(access: &str, refresh: Option<&str>) -> Token {
        let token = Token::new(access).with_expires_at(Utc::now() - Duration::seconds(10));
        match refresh {
            Some(r) => token.with_refresh_token(r),
            None => token,
        }
    }

    #[tokio::test]
    async fn test_fetch_token_sends_password_grant() {
        let endpoint = TokenEndpoint::new(vec![token_json("abc", Some("def"))]);
        let manager = TokenManager::new(config(), endpoint.clone());

        let token = manager.fetch_token().await.unwrap();
        assert_eq!(token.access_token, "abc");

        let requests = endpoint.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.url, "https://api.nic.ru/oauth/token");
        assert_eq!(request.form_field("grant_type"), Some("password"));
        assert_eq!(request.form_field("username"), Some("123/NIC-D"));
        assert_eq!(request.form_field("scope"), Some(".+:/dns-master/.+"));
        assert_eq!(request.form_field("client_id"), Some("app"));
        assert_eq!(request.form_field("offline"), Some("3600"));
        assert!(request.bearer.is_none());
    }

    #[tokio::test]
    async fn test_invalid_grant_is_auth_error() {
        let endpoint = TokenEndpoint::new(vec![HttpResponse::new(
            400,
            r#"{"error":"invalid_grant","error_description":"Bad credentials"}"#,
        )]);
        let manager = TokenManager::new(config(), endpoint);

        let err = manager.fetch_token().await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_fetch_without_credentials_is_config_error() {
        let endpoint = TokenEndpoint::new(vec![]);
        let manager = TokenManager::new(Arc::new(NicConfig::new("app", "secret")), endpoint);

        let err = manager.fetch_token().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_valid_token_reuses_fresh_token() {
        let endpoint = TokenEndpoint::new(vec![]);
        let manager = TokenManager::new(config(), endpoint.clone()).with_token(
            Token::new("fresh").with_expires_at(Utc::now() + Duration::seconds(600)),
        );

        assert_eq!(manager.valid_token().await.unwrap(), "fresh");
        assert!(endpoint.grants().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_updater_called() {
        let endpoint = TokenEndpoint::new(vec![token_json("new", None)]);
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        let store = Arc::new(MemoryTokenStore::new());

        let manager = TokenManager::new(config(), endpoint.clone())
            .with_token(expired("old", Some("refresh-1")))
            .with_store(store.clone())
            .with_updater(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(manager.valid_token().await.unwrap(), "new");
        assert_eq!(endpoint.grants(), vec!["refresh_token"]);
        assert_eq!(updates.load(Ordering::SeqCst), 1);

        // Refresh token carried over when the server does not rotate it
        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.access_token, "new");
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_falls_back_to_password() {
        let endpoint = TokenEndpoint::new(vec![
            HttpResponse::new(400, r#"{"error":"invalid_grant"}"#),
            token_json("via-password", Some("r2")),
        ]);
        let manager =
            TokenManager::new(config(), endpoint.clone()).with_token(expired("old", Some("r1")));

        assert_eq!(manager.valid_token().await.unwrap(), "via-password");
        assert_eq!(endpoint.grants(), vec!["refresh_token", "password"]);
    }

    #[tokio::test]
    async fn test_no_token_no_credentials() {
        let endpoint = TokenEndpoint::new(vec![]);
        let manager = TokenManager::new(Arc::new(NicConfig::new("app", "secret")), endpoint);

        let err = manager.valid_token().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_force_refresh_skips_exchange_if_already_renewed() {
        let endpoint = TokenEndpoint::new(vec![]);
        let manager = TokenManager::new(config(), endpoint.clone())
            .with_token(Token::new("renewed-elsewhere"));

        let token = manager.force_refresh("stale").await.unwrap();
        assert_eq!(token, "renewed-elsewhere");
        assert!(endpoint.grants().is_empty());
    }

    #[tokio::test]
    async fn test_force_refresh_renews_expired_replacement() {
        let endpoint = TokenEndpoint::new(vec![token_json("fresh", Some("r2"))]);
        let manager =
            TokenManager::new(config(), endpoint.clone()).with_token(expired("other", Some("r1")));

        let token = manager.force_refresh("stale").await.unwrap();
        assert_eq!(token, "fresh");
        assert_eq!(endpoint.grants(), vec!["refresh_token"]);
    }

    #[tokio::test]
    async fn test_set_token_and_restore_skip_updater() {
        let endpoint = TokenEndpoint::new(vec![]);
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        let store = Arc::new(MemoryTokenStore::with_token(Token::new("saved")));

        let manager = TokenManager::new(config(), endpoint)
            .with_store(store)
            .with_updater(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        assert!(manager.restore().await.unwrap());
        assert_eq!(manager.current_token().await.unwrap().access_token, "saved");
        manager.set_token(Token::new("manual")).await;
        assert_eq!(updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let endpoint = TokenEndpoint::new(vec![]);
        let manager =
            TokenManager::new(config(), endpoint).with_token(Token::new("very_secret_bearer"));
        let debug_str = format!("{:?}", manager);
        assert!(!debug_str.contains("very_secret_bearer"));
        assert!(!debug_str.contains("pass"));
    }
}
