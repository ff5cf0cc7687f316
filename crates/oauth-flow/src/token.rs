//! Token endpoint interactions
//!
//! Two calls land here: the authorization-code exchange at the end of a
//! mint, and the refresh grant for an expired cached credential. Both POST
//! a form to the configured token endpoint and decode the same reply shape.

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::OAuthConfig;
use crate::credential::Credential;
use crate::error::{Error, Result};

/// Reply from the token endpoint for both exchange and refresh.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires, relative to the reply.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// Build the credential to persist.
    ///
    /// The relative `expires_in` becomes an absolute expiry instant, a
    /// missing token type defaults to `Bearer`, and `previous_refresh` is
    /// carried forward when the reply omits a refresh token, as refresh
    /// replies usually do.
    pub fn into_credential(self, previous_refresh: Option<String>) -> Credential {
        Credential {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: self
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs as i64)),
        }
    }
}

/// Exchange an authorization code for a token.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse> {
    debug!("exchanging authorization code");
    let response = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", verifier),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
            ("redirect_uri", config.redirect_url.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Exchange(format!("token endpoint request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(Error::Exchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::Exchange(format!("invalid token response: {e}")))
}

/// Trade a refresh token for a fresh access token.
pub async fn refresh_token(
    client: &reqwest::Client,
    config: &OAuthConfig,
    refresh: &str,
) -> Result<TokenResponse> {
    debug!("refreshing access token");
    let response = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Refresh(format!("token endpoint request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Refresh(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }
        return Err(Error::Refresh(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::Refresh(format!("invalid refresh response: {e}")))
}
