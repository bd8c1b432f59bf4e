// # nicdns-core
//
// Client library for the NIC.RU DNS-master REST API.
//
// ## Architecture Overview
//
// - **TokenManager**: Acquires and refreshes the OAuth2 bearer token, notifies
//   the token-updater callback and the token store of every new token
// - **NicClient**: Lists services, zones and records; stages record additions
//   and deletions; commits or rolls back pending zone changes
// - **Transport**: Trait for the HTTP stack (`nicdns-http` provides reqwest)
// - **TokenStore**: Trait for persisting the token between runs
//
// ## Design Principles
//
// 1. **One refresh, one retry**: A rejected token is renewed once and the call
//    is retried once; anything else is returned to the caller
// 2. **Staged writes**: Nothing changes in a zone until `commit`
// 3. **No transport in core**: HTTP is behind the `Transport` trait

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod traits;
pub mod xml;

// Re-export core types for convenience
pub use auth::{Token, TokenManager, TokenUpdater};
pub use client::NicClient;
pub use config::NicConfig;
pub use error::{Error, Result};
pub use models::{DnsRecord, RecordData, RecordType, Service, Zone};
pub use store::{FileTokenStore, MemoryTokenStore};
pub use traits::{TokenStore, Transport};
