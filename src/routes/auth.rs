// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in routes: registration, credential login, sessions and the OAuth
//! redirect flow.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE, SESSION_MAX_AGE_SECS};
use crate::models::User;
use crate::services::{LoginMethod, OAuthProvider};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// OAuth `state` values older than this are ignored.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/{provider}", get(auth_start))
        .route("/auth/{provider}/callback", get(auth_callback))
}

/// Routes that need a session. The auth middleware is applied in routes/mod.rs.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/session", get(session))
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub email_verified: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
            image: user.image,
            email_verified: user.email_verified.map(format_utc_rfc3339),
        }
    }
}

#[derive(Serialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[serde(default)]
    #[validate(email)]
    email: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 128))]
    password: String,
}

// ─── Registration & Login ────────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>)> {
    body.validate()?;
    let user = state
        .identity
        .register(&body.name, &body.email, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope { user: user.into() }),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(method): Json<LoginMethod>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let user = state.identity.resolve(&method).await?;
    let token = issue_session(&state.config, &user)?;

    tracing::info!(email = %user.email, "Login successful");

    Ok((
        jar.add(session_cookie(&state.config, token.clone())),
        Json(LoginResponse {
            token,
            user: user.into(),
        }),
    ))
}

async fn session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserEnvelope>> {
    let user = state.db.get_user(&auth.email).await?.ok_or_else(|| {
        tracing::warn!(email = %auth.email, "Session for missing user");
        AppError::Unauthorized
    })?;

    Ok(Json(UserEnvelope { user: user.into() }))
}

async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

fn issue_session(config: &Config, user: &User) -> Result<String> {
    create_jwt(&user.email, &config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_MAX_AGE_SECS as i64))
        .build()
}

// ─── OAuth redirect flow ─────────────────────────────────────

/// Query parameters for starting OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to redirect back to after OAuth completes.
    /// If not provided, uses FRONTEND_URL env var.
    #[serde(default)]
    redirect_uri: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    error: Option<String>,
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Only the configured frontend and local dev origins may receive tokens.
fn allowed_frontend(config: &Config, url: &str) -> bool {
    super::is_trusted_origin(&config.frontend_url, url)
}

fn callback_url(headers: &axum::http::HeaderMap, provider: OAuthProvider) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/auth/{}/callback", scheme, host, provider.as_str())
}

/// Start OAuth flow - redirect to the provider's authorization page.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<AuthStartParams>,
    headers: axum::http::HeaderMap,
) -> Result<Redirect> {
    let provider: OAuthProvider = provider.parse()?;

    let frontend_url = params
        .redirect_uri
        .filter(|url| allowed_frontend(&state.config, url))
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let oauth_state = sign_state(&frontend_url, now_millis()?, &state.config.oauth_state_key)?;
    let auth_url = state.identity.authorize_url(
        provider,
        &callback_url(&headers, provider),
        &oauth_state,
    )?;

    tracing::info!(
        provider = provider.as_str(),
        frontend_url = %frontend_url,
        "Starting OAuth flow"
    );

    Ok(Redirect::temporary(&auth_url))
}

/// OAuth callback - exchange code for a token, create session.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: axum::http::HeaderMap,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let provider: OAuthProvider = provider.parse()?;

    let frontend_url = verify_and_decode_state(
        &params.state,
        &state.config.oauth_state_key,
        now_millis()?,
    )
    .unwrap_or_else(|| {
        tracing::warn!("Invalid or stale state parameter, falling back to default frontend URL");
        state.config.frontend_url.clone()
    });

    if let Some(error) = params.error {
        tracing::warn!(error = %error, provider = provider.as_str(), "OAuth error from provider");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let access_token = state
        .identity
        .exchange_code(provider, &code, &callback_url(&headers, provider))
        .await?;
    let user = state
        .identity
        .resolve(&LoginMethod::OAuth {
            provider,
            token: access_token,
        })
        .await?;

    let jwt = issue_session(&state.config, &user)?;
    tracing::info!(email = %user.email, provider = provider.as_str(), "OAuth login successful");

    let redirect_url = format!("{}/callback?token={}", frontend_url, jwt);
    Ok((
        jar.add(session_cookie(&state.config, jwt)),
        Redirect::temporary(&redirect_url),
    ))
}

/// Encode `frontend_url|timestamp_hex|signature_hex` as URL-safe base64.
fn sign_state(frontend_url: &str, now_ms: u128, secret: &[u8]) -> Result<String> {
    let state_payload = format!("{}|{:x}", frontend_url, now_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify HMAC signature and age, and decode the frontend URL from the OAuth state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "frontend_url|timestamp_hex|signature_hex"; the URL may contain '|'.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let frontend_url = parts.next()?;

    let payload = format!("{}|{}", frontend_url, timestamp_hex);
    let signature = hex::decode(signature_hex).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(issued_ms) > STATE_MAX_AGE_MS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(frontend_url.to_string())
}
