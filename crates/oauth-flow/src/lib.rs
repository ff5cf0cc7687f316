//! OAuth2 mint-and-cache flow
//!
//! Library behind the `oauth2token` binary: obtains an access credential
//! through the authorization-code grant with a local callback listener,
//! caches it in a file-backed secret store, and refreshes it once it goes
//! stale.
//!
//! Acquisition paths, in the order the manager tries them:
//! 1. Cached credential still valid: returned as-is.
//! 2. Cached but expired: refreshed against the token endpoint.
//! 3. Absent: minted via browser authorization, local callback, and code
//!    exchange.

pub mod callback;
pub mod config;
pub mod credential;
pub mod error;
pub mod manager;
pub mod pkce;
pub mod state;
pub mod store;
pub mod token;

pub use callback::await_code;
pub use config::OAuthConfig;
pub use credential::Credential;
pub use error::{Error, Result};
pub use manager::{SystemOpener, TokenManager, UrlOpener};
pub use store::{FileSecretStore, SecretStore};
pub use token::{TokenResponse, exchange_code, refresh_token};
