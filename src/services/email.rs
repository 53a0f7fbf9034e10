// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound email via the Resend HTTP API.

use crate::error::AppError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const RESEND_API_URL: &str = "https://api.resend.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Clone)]
enum SenderMode {
    Resend {
        http: reqwest::Client,
        api_key: String,
        base_url: String,
    },
    /// Keep messages in memory instead of sending them.
    Capture(Arc<Mutex<Vec<OutgoingEmail>>>),
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: String,
}

/// Email sender.
#[derive(Clone)]
pub struct EmailSender {
    from: String,
    mode: SenderMode,
}

impl EmailSender {
    /// Sender that delivers through Resend.
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building email HTTP client")?;

        Ok(Self {
            from: from.into(),
            mode: SenderMode::Resend {
                http,
                api_key: api_key.into(),
                base_url: RESEND_API_URL.to_string(),
            },
        })
    }

    /// Sender that records messages for later inspection.
    pub fn new_capture(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            mode: SenderMode::Capture(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Messages recorded so far (always empty for a live sender).
    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        match &self.mode {
            SenderMode::Capture(outbox) => outbox.lock().await.clone(),
            SenderMode::Resend { .. } => Vec::new(),
        }
    }

    /// Send a message. Any delivery failure is an upstream error.
    pub async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        match &self.mode {
            SenderMode::Capture(outbox) => {
                tracing::debug!(to = %email.to, subject = %email.subject, "Captured email");
                outbox.lock().await.push(email);
                Ok(())
            }
            SenderMode::Resend {
                http,
                api_key,
                base_url,
            } => {
                let body = ResendRequest {
                    from: &self.from,
                    to: [email.to.as_str()],
                    subject: &email.subject,
                    html: &email.html,
                };

                let response = http
                    .post(format!("{}/emails", base_url))
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| AppError::Upstream(format!("Email request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Upstream(format!(
                        "Email provider HTTP {}: {}",
                        status, body
                    )));
                }

                let sent: ResendResponse = response.json().await.map_err(|e| {
                    AppError::Upstream(format!("Email provider JSON parse error: {}", e))
                })?;

                tracing::info!(message_id = %sent.id, "Email sent");
                Ok(())
            }
        }
    }
}

/// Render the verification code email.
pub fn verification_email(to: &str, code: &str, validity_minutes: i64) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify your email".to_string(),
        html: format!(
            "<h1>Email Verification</h1>\
             <p>Your verification code is: <strong>{code}</strong></p>\
             <p>This code will expire in {validity_minutes} minutes.</p>"
        ),
    }
}
