//! Cached credential model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Safety skew subtracted from the expiry when judging validity, so a token
/// is never handed out with only moments left on the clock.
const EXPIRY_SKEW_SECS: i64 = 10;

/// The credential persisted in the secret store.
///
/// Serialization is lossless: an absent `refresh_token` or `expiry` stays
/// absent through a store round-trip rather than turning into a sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiration instant. `None` means the token never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Whether the credential can still be used.
    ///
    /// Valid iff no expiry is recorded, or the current time is strictly
    /// before the expiry minus the safety skew.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            None => true,
            Some(expiry) => now < expiry - Duration::seconds(EXPIRY_SKEW_SECS),
        }
    }
}
