// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WORKOUT.IO API Server
//!
//! Verifies user emails, stores saved workout plans, and generates new plans
//! with Gemini.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workout_io::{
    config::{Config, StorageBackend},
    db::{Database, FirestoreDb},
    services::{
        EmailSender, GenerationGateway, IdentityProvider, VerificationService, WorkoutService,
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, storage = ?config.storage, "Starting WORKOUT.IO API");

    let db = match config.storage {
        StorageBackend::Firestore => Database::Firestore(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Database::in_memory()
        }
    };

    let mailer = EmailSender::new(&config.resend_api_key, &config.email_from)
        .expect("Failed to initialize email sender");

    let generator = GenerationGateway::new(&config.gemini_api_key, &config.gemini_model)
        .expect("Failed to initialize generation gateway");
    tracing::info!(model = %config.gemini_model, "Generation gateway initialized");

    let identity =
        IdentityProvider::new(db.clone(), &config).expect("Failed to initialize identity provider");
    tracing::info!(
        google = config.google_oauth.is_some(),
        github = config.github_oauth.is_some(),
        "OAuth providers configured"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        verification: VerificationService::new(db.clone(), mailer),
        workouts: WorkoutService::new(db.clone()),
        generator,
        identity,
        db,
    });

    // Build router
    let app = workout_io::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("workout_io=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
