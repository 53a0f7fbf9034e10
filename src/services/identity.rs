// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in resolution: email/password credentials and OAuth providers.
//!
//! The provider only answers "which user is this?". Session issuance lives
//! in `middleware::auth`.

use crate::config::{Config, OAuthClient};
use crate::db::Database;
use crate::error::AppError;
use crate::models::{normalize_email, User};
use anyhow::Context;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "workout-io";

/// Supported social login providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }

    fn authorize_endpoint(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            OAuthProvider::Github => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_endpoint(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::Github => "https://github.com/login/oauth/access_token",
        }
    }

    fn scope(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "openid email profile",
            OAuthProvider::Github => "read:user user:email",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            other => Err(AppError::Validation(format!(
                "Unsupported provider: {}",
                other
            ))),
        }
    }
}

/// How a caller proves who they are.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum LoginMethod {
    Credentials {
        email: String,
        password: String,
    },
    #[serde(rename = "oauth")]
    OAuth {
        provider: OAuthProvider,
        /// Provider access token
        token: String,
    },
}

/// Identity asserted by an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub email_verified: bool,
}

// ─── Password hashing ────────────────────────────────────────

/// Hash a password with Argon2id (PHC string). Runs off the async runtime.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
}

/// Check a password against a stored PHC string.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Stored hash invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
}

// ─── Provider wire types ─────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Clone)]
enum ProviderMode {
    Live { http: reqwest::Client },
    /// Access token -> profile table; authorization codes are used as tokens.
    Static {
        profiles: Arc<HashMap<String, ProviderProfile>>,
    },
}

/// Resolves a `LoginMethod` to a stored `User`.
#[derive(Clone)]
pub struct IdentityProvider {
    db: Database,
    google: Option<OAuthClient>,
    github: Option<OAuthClient>,
    mode: ProviderMode,
}

impl IdentityProvider {
    pub fn new(db: Database, config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("failed building identity HTTP client")?;

        Ok(Self {
            db,
            google: config.google_oauth.clone(),
            github: config.github_oauth.clone(),
            mode: ProviderMode::Live { http },
        })
    }

    /// Provider with a fixed token table.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_static(
        db: Database,
        config: &Config,
        profiles: HashMap<String, ProviderProfile>,
    ) -> Self {
        Self {
            db,
            google: config.google_oauth.clone(),
            github: config.github_oauth.clone(),
            mode: ProviderMode::Static {
                profiles: Arc::new(profiles),
            },
        }
    }

    fn client(&self, provider: OAuthProvider) -> Result<&OAuthClient, AppError> {
        match provider {
            OAuthProvider::Google => self.google.as_ref(),
            OAuthProvider::Github => self.github.as_ref(),
        }
        .ok_or_else(|| {
            AppError::Validation(format!("Provider {} is not configured", provider.as_str()))
        })
    }

    // ─── Registration ────────────────────────────────────────

    /// Create a credentials account. The email starts unverified.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let user = User {
            email: normalize_email(email),
            name: Some(name.trim().to_string()).filter(|n| !n.is_empty()),
            hashed_password: Some(hash_password(password).await?),
            email_verified: None,
            image: None,
            created_at: Utc::now(),
        };
        self.db.create_user(&user).await?;

        tracing::info!(email = %user.email, "User registered");
        Ok(user)
    }

    // ─── Sign-in ─────────────────────────────────────────────

    /// Resolve a login attempt to a user, creating social accounts on first use.
    pub async fn resolve(&self, method: &LoginMethod) -> Result<User, AppError> {
        match method {
            LoginMethod::Credentials { email, password } => {
                self.resolve_credentials(email, password).await
            }
            LoginMethod::OAuth { provider, token } => self.resolve_oauth(*provider, token).await,
        }
    }

    async fn resolve_credentials(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        let Some(user) = self.db.get_user(&email).await? else {
            tracing::warn!(email = %email, "Login for unknown user");
            return Err(AppError::InvalidCredentials);
        };
        let Some(hash) = user.hashed_password.as_deref() else {
            tracing::warn!(email = %email, "Password login for social-only account");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, hash).await? {
            tracing::warn!(email = %email, "Wrong password");
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    async fn resolve_oauth(&self, provider: OAuthProvider, token: &str) -> Result<User, AppError> {
        self.client(provider)?;
        let profile = self.fetch_profile(provider, token).await?;
        let email = normalize_email(&profile.email);
        let now = Utc::now();

        let user = match self.db.get_user(&email).await? {
            Some(mut user) => {
                if user.name.is_none() {
                    user.name = profile.name;
                }
                if user.image.is_none() {
                    user.image = profile.image;
                }
                if profile.email_verified && user.email_verified.is_none() {
                    user.email_verified = Some(now);
                }
                self.db.upsert_user(&user).await?;
                user
            }
            None => {
                let user = User {
                    email,
                    name: profile.name,
                    hashed_password: None,
                    email_verified: profile.email_verified.then_some(now),
                    image: profile.image,
                    created_at: now,
                };
                self.db.create_user(&user).await?;
                tracing::info!(email = %user.email, provider = provider.as_str(), "User created from OAuth");
                user
            }
        };

        Ok(user)
    }

    // ─── OAuth plumbing ──────────────────────────────────────

    /// Provider authorization URL for the redirect leg of the flow.
    pub fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_uri: &str,
        state: &str,
    ) -> Result<String, AppError> {
        let client = self.client(provider)?;
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            provider.authorize_endpoint(),
            urlencoding::encode(&client.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(provider.scope()),
            urlencoding::encode(state),
        ))
    }

    /// Exchange an authorization code for a provider access token.
    pub async fn exchange_code(
        &self,
        provider: OAuthProvider,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, AppError> {
        let client = self.client(provider)?;

        let http = match &self.mode {
            ProviderMode::Static { .. } => return Ok(code.to_string()),
            ProviderMode::Live { http } => http,
        };

        let response = http
            .post(provider.token_endpoint())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Token exchange request failed: {}", e)))?;

        if response.status().is_client_error() {
            tracing::warn!(provider = provider.as_str(), status = %response.status(), "Code exchange rejected");
            return Err(AppError::InvalidCredentials);
        }
        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Token exchange HTTP {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Token exchange JSON parse error: {}", e)))?;

        match (token.access_token, token.error) {
            (Some(access_token), None) => Ok(access_token),
            (_, error) => {
                tracing::warn!(provider = provider.as_str(), error = ?error, "Code exchange returned no token");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    async fn fetch_profile(
        &self,
        provider: OAuthProvider,
        token: &str,
    ) -> Result<ProviderProfile, AppError> {
        let http = match &self.mode {
            ProviderMode::Static { profiles } => {
                return profiles
                    .get(token)
                    .cloned()
                    .ok_or(AppError::InvalidCredentials)
            }
            ProviderMode::Live { http } => http,
        };

        match provider {
            OAuthProvider::Google => {
                let info: GoogleUserInfo = get_json(
                    http,
                    "https://openidconnect.googleapis.com/v1/userinfo",
                    token,
                )
                .await?;
                let email = info.email.ok_or_else(|| {
                    AppError::Validation("Google account has no email address".to_string())
                })?;
                Ok(ProviderProfile {
                    email,
                    name: info.name,
                    image: info.picture,
                    email_verified: info.email_verified,
                })
            }
            OAuthProvider::Github => {
                let user: GithubUser = get_json(http, "https://api.github.com/user", token).await?;
                let emails: Vec<GithubEmail> =
                    get_json(http, "https://api.github.com/user/emails", token).await?;
                let primary = emails
                    .into_iter()
                    .find(|e| e.primary && e.verified)
                    .ok_or_else(|| {
                        AppError::Validation(
                            "GitHub account has no verified primary email".to_string(),
                        )
                    })?;
                Ok(ProviderProfile {
                    email: primary.email,
                    name: user.name.or(Some(user.login)),
                    image: user.avatar_url,
                    email_verified: true,
                })
            }
        }
    }
}

/// Bearer-authenticated GET; 401/403 mean the token was not accepted.
async fn get_json<T: for<'de> Deserialize<'de>>(
    http: &reqwest::Client,
    url: &str,
    token: &str,
) -> Result<T, AppError> {
    let response = http
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Identity request failed: {}", e)))?;

    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(AppError::InvalidCredentials);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Identity JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with(profiles: HashMap<String, ProviderProfile>) -> (IdentityProvider, Database) {
        let db = Database::in_memory();
        let provider =
            IdentityProvider::new_static(db.clone(), &Config::test_default(), profiles);
        (provider, db)
    }

    #[test]
    fn test_login_method_deserialize() {
        let creds: LoginMethod = serde_json::from_str(
            r#"{"method": "credentials", "email": "a@example.com", "password": "hunter22"}"#,
        )
        .unwrap();
        assert!(matches!(creds, LoginMethod::Credentials { .. }));

        let oauth: LoginMethod = serde_json::from_str(
            r#"{"method": "oauth", "provider": "github", "token": "gho_123"}"#,
        )
        .unwrap();
        assert!(matches!(
            oauth,
            LoginMethod::OAuth {
                provider: OAuthProvider::Github,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_credentials_login() {
        let (provider, _) = provider_with(HashMap::new());
        provider
            .register("Sam", "Sam@Example.com", "squat-rack-42")
            .await
            .unwrap();

        let user = provider
            .resolve(&LoginMethod::Credentials {
                email: "sam@example.com".to_string(),
                password: "squat-rack-42".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.email, "sam@example.com");
        assert!(!user.is_verified());

        let err = provider
            .resolve(&LoginMethod::Credentials {
                email: "sam@example.com".to_string(),
                password: "bench-press".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_duplicate_conflicts() {
        let (provider, _) = provider_with(HashMap::new());
        provider.register("A", "a@example.com", "password1").await.unwrap();
        let err = provider
            .register("B", "A@example.com", "password2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_oauth_first_login_creates_verified_user() {
        let mut profiles = HashMap::new();
        profiles.insert(
            "ya29.token".to_string(),
            ProviderProfile {
                email: "Runner@Gmail.com".to_string(),
                name: Some("Runner".to_string()),
                image: Some("https://example.com/r.png".to_string()),
                email_verified: true,
            },
        );
        let (provider, db) = provider_with(profiles);

        let user = provider
            .resolve(&LoginMethod::OAuth {
                provider: OAuthProvider::Google,
                token: "ya29.token".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.email, "runner@gmail.com");
        assert!(user.is_verified());
        assert!(user.hashed_password.is_none());
        assert!(db.get_user("runner@gmail.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_oauth_unknown_token_and_unconfigured_provider() {
        let (provider, _) = provider_with(HashMap::new());

        let err = provider
            .resolve(&LoginMethod::OAuth {
                provider: OAuthProvider::Google,
                token: "bogus".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        // GitHub has no client configured in the test config.
        let err = provider
            .resolve(&LoginMethod::OAuth {
                provider: OAuthProvider::Github,
                token: "gho_123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_authorize_url() {
        let (provider, _) = provider_with(HashMap::new());
        let url = provider
            .authorize_url(
                OAuthProvider::Google,
                "http://localhost:8080/auth/google/callback",
                "abc",
            )
            .unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?client_id=google_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.ends_with("state=abc"));
    }
}
