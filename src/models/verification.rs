//! One-time email verification codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outstanding verification code for an email address.
///
/// Stored in the `verification_tokens` collection keyed by `identifier`, so
/// at most one code per address is live at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationToken {
    /// Target email address
    pub identifier: String,
    /// Six-digit decimal code
    pub token: String,
    /// Absolute expiry
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires: DateTime<Utc>,
}

impl VerificationToken {
    /// A token is usable strictly before its expiry instant.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires
    }

    /// Whether `code` matches this token and the token is still live.
    ///
    /// The comparison runs in constant time.
    pub fn matches(&self, code: &str, now: DateTime<Utc>) -> bool {
        use subtle::ConstantTimeEq;

        let same: bool = self.token.as_bytes().ct_eq(code.as_bytes()).into();
        same && self.is_live(now)
    }
}
