//! Token lifecycle management
//!
//! Decides between the three ways to satisfy "give me a valid token":
//! return the cached credential, refresh it, or mint a new one through the
//! browser flow. Every path that changes the credential persists it before
//! returning it.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::callback::await_code;
use crate::config::OAuthConfig;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::pkce::{compute_challenge, generate_verifier};
use crate::state::generate_state;
use crate::store::SecretStore;
use crate::token::{exchange_code, refresh_token};

/// Fixed key the serialized credential lives under in the secret store.
pub const SECRET_KEY: &str = "token";

/// How long the callback listener waits for the browser round-trip.
pub const CALLBACK_DEADLINE: Duration = Duration::from_secs(300);

/// Fire-and-forget launch of a URL in the user's browser.
///
/// A trait seam so the flow can run without a display server; the
/// production implementation shells out through the platform handler.
pub trait UrlOpener: Send + Sync {
    fn open_url(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the platform handler (xdg-open and friends).
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open_url(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// Orchestrates the secret store, the callback listener, and the token
/// endpoint.
pub struct TokenManager {
    config: OAuthConfig,
    store: Arc<dyn SecretStore>,
    opener: Arc<dyn UrlOpener>,
    http: reqwest::Client,
    callback_deadline: Duration,
}

impl TokenManager {
    pub fn new(config: OAuthConfig, store: Arc<dyn SecretStore>, http: reqwest::Client) -> Self {
        Self {
            config,
            store,
            opener: Arc::new(SystemOpener),
            http,
            callback_deadline: CALLBACK_DEADLINE,
        }
    }

    /// Replace the URL opener. Tests use this to avoid launching a browser.
    pub fn with_opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Override the callback deadline.
    pub fn with_callback_deadline(mut self, deadline: Duration) -> Self {
        self.callback_deadline = deadline;
        self
    }

    /// Produce a valid credential: cached, refreshed, or freshly minted.
    ///
    /// A cached credential that fails to decode is an error, not a trigger
    /// for re-minting; a corrupt-but-present secret means a storage problem
    /// that a silent re-authorization would mask. A failed refresh is
    /// likewise surfaced instead of falling back to a mint.
    pub async fn acquire(&self) -> Result<Credential> {
        let bytes = match self.store.get(SECRET_KEY).await {
            Ok(bytes) => bytes,
            Err(Error::NotFound(_)) => {
                debug!("no cached credential, minting a new one");
                return self.mint().await;
            }
            Err(e) => return Err(e),
        };

        let credential: Credential = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Serialization(format!("decoding cached credential: {e}")))?;

        if credential.is_valid() {
            debug!("cached credential is still valid");
            return Ok(credential);
        }

        debug!("cached credential expired, refreshing");
        self.refresh(credential).await
    }

    /// Browser flow: authorization URL, local callback, code exchange.
    async fn mint(&self) -> Result<Credential> {
        let state = generate_state();
        let verifier = generate_verifier();
        let challenge = compute_challenge(&verifier);
        let url = self.config.authorization_url(&state, &challenge)?;

        eprintln!("Please open this URL to authorize access:");
        eprintln!("{url}");
        self.opener
            .open_url(&url)
            .map_err(|e| Error::Launch(e.to_string()))?;

        let code = await_code(&state, &self.config.redirect_url, self.callback_deadline).await?;
        let response = exchange_code(&self.http, &self.config, &code, &verifier).await?;

        let credential = response.into_credential(None);
        self.persist(&credential).await?;
        Ok(credential)
    }

    async fn refresh(&self, cached: Credential) -> Result<Credential> {
        let Some(refresh) = cached.refresh_token.as_deref() else {
            return Err(Error::Refresh(
                "cached credential has no refresh token".to_string(),
            ));
        };

        let response = refresh_token(&self.http, &self.config, refresh).await?;

        let credential = response.into_credential(cached.refresh_token);
        self.persist(&credential).await?;
        Ok(credential)
    }

    /// Serialize and overwrite the stored credential. A failure here drops
    /// the fresh credential; the caller sees only the error.
    async fn persist(&self, credential: &Credential) -> Result<()> {
        let bytes = serde_json::to_vec(credential)
            .map_err(|e| Error::Serialization(format!("encoding credential: {e}")))?;
        self.store.set(SECRET_KEY, bytes).await
    }
}
