//! OAuth2 token handling
//!
//! - [`Token`]: bearer token as issued by `/oauth/token`
//! - [`TokenManager`]: acquisition, refresh and sharing of the token

pub mod manager;
pub mod token;

pub use manager::{TokenManager, TokenUpdater};
pub use token::Token;
