// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (session signing key, Resend and Gemini API keys, OAuth client
//! secrets) are read once at startup and kept in memory.

use std::env;

/// Which store backs users, verification tokens and saved workouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND")),
        }
    }
}

/// OAuth client credentials for a single provider.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Storage backend selection
    pub storage: StorageBackend,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Sender address for verification emails
    pub email_from: String,
    /// Gemini model used for workout generation
    pub gemini_model: String,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    /// Resend API key
    pub resend_api_key: String,
    /// Google Generative Language API key
    pub gemini_api_key: String,
    /// Google OAuth client, if configured
    pub google_oauth: Option<OAuthClient>,
    /// GitHub OAuth client, if configured
    pub github_oauth: Option<OAuthClient>,
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            storage: StorageBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            email_from: "test@workout.io".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!".to_vec(),
            resend_api_key: "test_resend_key".to_string(),
            gemini_api_key: "test_gemini_key".to_string(),
            google_oauth: Some(OAuthClient {
                client_id: "google_client_id".to_string(),
                client_secret: "google_client_secret".to_string(),
            }),
            github_oauth: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = required("JWT_SIGNING_KEY")?.into_bytes();
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(|v| v.trim().as_bytes().to_vec())
            .unwrap_or_else(|_| jwt_signing_key.clone());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "onboarding@resend.dev".to_string()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),

            jwt_signing_key,
            oauth_state_key,
            resend_api_key: required("RESEND_API_KEY")?,
            gemini_api_key: required("GOOGLE_AI_API_KEY")?,
            google_oauth: oauth_client("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            github_oauth: oauth_client("GITHUB_ID", "GITHUB_SECRET"),
        })
    }

    /// Whether the frontend is served over HTTPS (controls `Secure` cookies).
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// A provider is enabled only when both halves of its credentials are set.
fn oauth_client(id_var: &str, secret_var: &str) -> Option<OAuthClient> {
    let client_id = env::var(id_var).ok()?.trim().to_string();
    let client_secret = env::var(secret_var).ok()?.trim().to_string();
    if client_id.is_empty() || client_secret.is_empty() {
        return None;
    }
    Some(OAuthClient {
        client_id,
        client_secret,
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("RESEND_API_KEY", "re_test");
        env::set_var("GOOGLE_AI_API_KEY", "ai_test");
        env::set_var("STORAGE_BACKEND", "memory");
        env::remove_var("OAUTH_STATE_KEY");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.resend_api_key, "re_test");
        assert_eq!(config.gemini_api_key, "ai_test");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.oauth_state_key, config.jwt_signing_key);
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(
            "Firestore".parse::<StorageBackend>().unwrap(),
            StorageBackend::Firestore
        );
        assert_eq!(
            " memory ".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_secure_cookies_follow_frontend_scheme() {
        let mut config = Config::test_default();
        assert!(!config.secure_cookies());
        config.frontend_url = "https://workout.io".to_string();
        assert!(config.secure_cookies());
    }
}
