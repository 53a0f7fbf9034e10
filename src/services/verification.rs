// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email ownership proof via one-time codes.
//!
//! Flow:
//! 1. `request_code` stores a fresh six-digit code (replacing any earlier one
//!    for the same address) and emails it.
//! 2. `verify_code` consumes the code and stamps `email_verified` on the user.

use crate::db::{Database, RedeemOutcome};
use crate::error::AppError;
use crate::models::{normalize_email, VerificationToken};
use crate::services::email::{verification_email, EmailSender};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};

/// How long an issued code stays valid.
pub const CODE_VALIDITY_MINUTES: i64 = 10;
/// Number of decimal digits in a code.
pub const CODE_LENGTH: usize = 6;

const CODE_MIN: u32 = 100_000;
const CODE_SPAN: u32 = 900_000;

/// Generate a code uniformly distributed over [100000, 999999].
pub fn generate_code(rng: &dyn SecureRandom) -> Result<String, AppError> {
    loop {
        let mut buf = [0u8; 4];
        rng.fill(&mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        if let Some(code) = code_from_draw(u32::from_be_bytes(buf)) {
            return Ok(code);
        }
    }
}

/// Map a raw 32-bit draw onto a code, or `None` if the draw must be rejected.
///
/// Draws at or above the largest multiple of the code span are discarded so
/// every code is equally likely.
fn code_from_draw(value: u32) -> Option<String> {
    let limit = u32::MAX - (u32::MAX % CODE_SPAN);
    (value < limit).then(|| (CODE_MIN + value % CODE_SPAN).to_string())
}

fn looks_like_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// Issues and redeems verification codes.
#[derive(Clone)]
pub struct VerificationService {
    db: Database,
    mailer: EmailSender,
    rng: SystemRandom,
}

impl VerificationService {
    pub fn new(db: Database, mailer: EmailSender) -> Self {
        Self {
            db,
            mailer,
            rng: SystemRandom::new(),
        }
    }

    /// Issue a code for `email` and send it. The code is never returned.
    pub async fn request_code(&self, email: &str) -> Result<(), AppError> {
        self.request_code_at(email, Utc::now()).await
    }

    pub async fn request_code_at(&self, email: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let email = normalize_email(email);
        let code = generate_code(&self.rng)?;

        let token = VerificationToken {
            identifier: email.clone(),
            token: code.clone(),
            expires: now + Duration::minutes(CODE_VALIDITY_MINUTES),
        };
        self.db.put_verification_token(&token).await?;

        self.mailer
            .send(verification_email(&email, &code, CODE_VALIDITY_MINUTES))
            .await?;

        tracing::info!(email = %email, expires = %token.expires, "Verification code issued");
        Ok(())
    }

    /// Redeem `code` for `email`.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.verify_code_at(email, code, Utc::now()).await
    }

    pub async fn verify_code_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let email = normalize_email(email);
        let code = code.trim();

        if !looks_like_code(code) {
            tracing::warn!(email = %email, "Rejected malformed verification code");
            return Err(AppError::InvalidOrExpiredCode);
        }

        match self.db.redeem_verification_token(&email, code, now).await? {
            RedeemOutcome::Verified => {
                tracing::info!(email = %email, "Email verified");
                Ok(())
            }
            RedeemOutcome::NoMatchingToken => {
                tracing::warn!(email = %email, "Invalid or expired verification code");
                Err(AppError::InvalidOrExpiredCode)
            }
            RedeemOutcome::UnknownUser => {
                tracing::warn!(email = %email, "Verification code matched but user is missing");
                Err(AppError::NotFound(format!("User {} not found", email)))
            }
        }
    }
}
