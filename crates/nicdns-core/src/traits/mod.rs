//! Core traits for the NIC.RU client
//!
//! This module defines the abstract interfaces the client is built on.
//!
//! - [`Transport`]: Execute HTTP requests
//! - [`TokenStore`]: Persist the OAuth2 token between runs

pub mod token_store;
pub mod transport;

pub use token_store::TokenStore;
pub use transport::{Body, HttpRequest, HttpResponse, Method, Transport};
