// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email verification routes.

use crate::error::Result;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/verify-email", post(verify_email))
        .route("/verify-otp", post(verify_otp))
}

#[derive(Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    #[validate(email)]
    email: String,
}

#[derive(Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    #[validate(email)]
    email: String,
    #[serde(default, alias = "code")]
    otp: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub message: String,
}

/// Send a fresh verification code to the given address.
async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>> {
    body.validate()?;
    state.verification.request_code(&body.email).await?;

    Ok(Json(MessageResponse {
        message: "Verification email sent".to_string(),
    }))
}

/// Redeem a verification code.
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>> {
    body.validate()?;
    state
        .verification
        .verify_code(&body.email, &body.otp)
        .await?;

    Ok(Json(MessageResponse {
        message: "Email verified successfully".to_string(),
    }))
}
