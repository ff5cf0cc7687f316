//! Anti-forgery state nonce
//!
//! Each mint attempt sends a fresh random nonce in the authorization URL and
//! requires the callback to echo it back. A callback with any other state is
//! rejected before its code or error parameters are even looked at.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use subtle::ConstantTimeEq;

/// Bytes of CSPRNG output behind each nonce. Encodes to 43 URL-safe
/// characters.
pub const STATE_LEN: usize = 32;

/// Generate a fresh state nonce for one authorization attempt.
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_LEN];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare the callback's state against the expected nonce.
///
/// The comparison runs in time independent of where the first differing
/// byte sits, so response timing leaks nothing about the nonce.
pub fn state_matches(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn state_is_43_url_safe_characters() {
        let state = generate_state();
        assert_eq!(state.len(), 43);
        assert!(
            state
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn states_are_unique() {
        let states: HashSet<String> = (0..64).map(|_| generate_state()).collect();
        assert_eq!(states.len(), 64);
    }

    #[test]
    fn matching_states_compare_equal() {
        let state = generate_state();
        assert!(state_matches(&state, &state.clone()));
    }

    #[test]
    fn differing_states_compare_unequal() {
        assert!(!state_matches("aaaaaaaa", "aaaaaaab"));
    }

    #[test]
    fn length_mismatch_compares_unequal() {
        let state = generate_state();
        assert!(!state_matches(&state, &state[..state.len() - 1]));
        assert!(!state_matches(&state, ""));
    }
}
