// # Token Store Trait
//
// Defines the interface for persisting the OAuth2 token.
//
// ## Purpose
//
// Every newly obtained token is handed to the configured store before the
// token-updater callback runs. On startup the token manager can restore the
// saved token and skip the password grant while the token (or its refresh
// token) is still usable.
//
// ## Implementations
//
// - Memory: `MemoryTokenStore`
// - File: `FileTokenStore` (JSON, atomic writes, backup recovery)

use async_trait::async_trait;

use crate::auth::Token;

/// Trait for token store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the saved token, if any
    async fn load(&self) -> Result<Option<Token>, crate::Error>;

    /// Save a token, replacing any previous one
    async fn save(&self, token: &Token) -> Result<(), crate::Error>;

    /// Remove the saved token
    async fn clear(&self) -> Result<(), crate::Error>;

    /// Store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
