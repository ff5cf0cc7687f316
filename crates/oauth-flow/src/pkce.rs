//! PKCE (Proof Key for Code Exchange) implementation
//!
//! RFC 7636: the authorization request carries a one-way challenge and the
//! code exchange proves possession of the verifier behind it, so an
//! intercepted authorization code is useless on its own.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random code verifier.
///
/// 32 random bytes as URL-safe base64 without padding, 43 characters, the
/// RFC 7636 section 4.1 minimum length.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge for a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
