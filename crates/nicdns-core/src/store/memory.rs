// # Memory Token Store
//
// In-memory implementation of TokenStore.
//
// Nothing survives a restart: the next run has to go through the password
// grant again. Useful for tests and for long-running embedders that only want
// the token-updater callback.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::auth::Token;
use crate::traits::TokenStore;

/// In-memory token store
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<RwLock<Option<Token>>>,
}

impl MemoryTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `token`
    pub fn with_token(token: Token) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(token))),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<Token>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, token: &Token) -> Result<(), Error> {
        *self.inner.write().await = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        *self.inner.write().await = None;
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
