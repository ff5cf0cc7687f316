//! OAuth client configuration
//!
//! Parses the client-credentials JSON downloaded from the provider console
//! (an `"installed"` or `"web"` section) together with a JSON array of
//! scopes, and builds authorization URLs from the result.

use common::Secret;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Scope appended to every request so long-lived sessions stay renewable.
pub const REAUTH_SCOPE: &str = "https://www.googleapis.com/auth/accounts.reauth";

/// Scope appended to every request to cover the Cloud Platform APIs the
/// minted token is used against.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Client-credentials file shape as downloaded from the console.
#[derive(Debug, Deserialize)]
struct ClientFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    #[serde(default)]
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// Everything the flow needs to talk to the authorization server.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub auth_url: String,
    pub token_url: String,
    /// First redirect URI from the client file. Its port is where the
    /// callback listener binds.
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Parse the client-credentials JSON and the scopes JSON.
    ///
    /// The `"installed"` section wins when both are present, and only the
    /// first redirect URI is used. [`REAUTH_SCOPE`] and
    /// [`CLOUD_PLATFORM_SCOPE`] are appended after the configured scopes.
    pub fn from_json(client_json: &[u8], scopes_json: &[u8]) -> common::Result<Self> {
        let file: ClientFile = serde_json::from_slice(client_json)?;
        let section = file.installed.or(file.web).ok_or_else(|| {
            common::Error::Config(
                "client file has neither an \"installed\" nor a \"web\" section".to_string(),
            )
        })?;
        let redirect_url = section
            .redirect_uris
            .first()
            .cloned()
            .ok_or_else(|| common::Error::Config("client file lists no redirect URIs".to_string()))?;

        let mut scopes: Vec<String> = serde_json::from_slice(scopes_json)?;
        scopes.push(REAUTH_SCOPE.to_string());
        scopes.push(CLOUD_PLATFORM_SCOPE.to_string());

        Ok(Self {
            client_id: section.client_id,
            client_secret: Secret::new(section.client_secret),
            auth_url: section.auth_uri,
            token_url: section.token_uri,
            redirect_url,
            scopes,
        })
    }

    /// Build the authorization URL for one mint attempt.
    ///
    /// Standard authorization-code parameters plus `access_type=offline`,
    /// so the reply includes a refresh token, and the S256 PKCE challenge.
    pub fn authorization_url(&self, state: &str, challenge: &str) -> Result<String> {
        let mut url = Url::parse(&self.auth_url).map_err(|e| {
            Error::Config(format!(
                "invalid authorization endpoint {}: {e}",
                self.auth_url
            ))
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url.into())
    }
}
