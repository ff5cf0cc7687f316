//! Error types for the token acquisition flow

use thiserror::Error;

/// Errors produced by the token acquisition flow.
///
/// Each variant keeps the kind of its originating stage all the way up to
/// the binary. Nothing in the flow retries or falls back on failure; in
/// particular a corrupt cached credential and a rejected refresh are both
/// terminal rather than triggers for a fresh browser authorization.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or unusable configuration, including a redirect address the
    /// callback listener cannot derive a port from.
    #[error("configuration error: {0}")]
    Config(String),

    /// The callback listener could not bind its port.
    #[error("failed to bind callback listener: {0}")]
    Bind(String),

    /// The callback listener aborted before producing an outcome.
    #[error("callback listener failed: {0}")]
    Server(String),

    /// The callback carried a state parameter that does not match the nonce
    /// sent with the authorization request.
    #[error("callback returned mismatched state")]
    StateMismatch,

    /// The authorization server redirected back with an explicit error.
    #[error("authorization failed with {code}: {description}")]
    Authorization { code: String, description: String },

    /// The callback carried neither a code nor an error.
    #[error("callback carried no error or code")]
    MalformedCallback,

    /// No callback arrived before the deadline.
    #[error("timed out waiting for callback")]
    Timeout,

    /// The authorization URL could not be handed to the browser.
    #[error("failed to open authorization url: {0}")]
    Launch(String),

    /// The authorization-code exchange against the token endpoint failed.
    #[error("token exchange failed: {0}")]
    Exchange(String),

    /// The refresh grant against the token endpoint failed.
    #[error("token refresh failed: {0}")]
    Refresh(String),

    /// The secret store could not be read or written.
    #[error("secret store error: {0}")]
    Storage(String),

    /// The secret store holds no value under the requested key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A cached credential could not be decoded, or a fresh one could not
    /// be encoded for storage.
    #[error("credential serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_stage() {
        let err = Error::Bind("address in use".to_string());
        assert!(err.to_string().contains("bind"));
        assert!(err.to_string().contains("address in use"));

        let err = Error::Refresh("server said no".to_string());
        assert!(err.to_string().contains("refresh"));
    }

    #[test]
    fn authorization_error_carries_code_and_description() {
        let err = Error::Authorization {
            code: "access_denied".to_string(),
            description: "user declined".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("access_denied"));
        assert!(msg.contains("user declined"));
    }

    #[test]
    fn timeout_message_is_stable() {
        assert_eq!(Error::Timeout.to_string(), "timed out waiting for callback");
    }

    #[test]
    fn error_debug_includes_variant() {
        let err = Error::NotFound("no entry for token".to_string());
        assert!(format!("{err:?}").contains("NotFound"));
    }
}
