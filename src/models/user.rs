//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account stored in Firestore (document ID is the normalized email).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Normalized email address (identity key)
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Argon2 PHC hash; absent for social-only accounts
    #[serde(default)]
    pub hashed_password: Option<String>,
    /// When the email address was verified
    #[serde(default)]
    #[serde(with = "firestore::serialize_as_optional_timestamp")]
    pub email_verified: Option<DateTime<Utc>>,
    /// Profile image URL
    #[serde(default)]
    pub image: Option<String>,
    /// When the account was created
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified.is_some()
    }
}

/// Emails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
