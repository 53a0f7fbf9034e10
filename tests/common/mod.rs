// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use std::collections::HashMap;
use std::sync::Arc;
use workout_io::config::Config;
use workout_io::db::{Database, FirestoreDb};
use workout_io::middleware::auth::create_jwt;
use workout_io::routes::create_router;
use workout_io::services::{
    EmailSender, GenerationGateway, IdentityProvider, ProviderProfile, VerificationService,
    WorkoutService,
};
use workout_io::AppState;

/// Access token accepted by the static Google identity table.
#[allow(dead_code)]
pub const GOOGLE_TEST_TOKEN: &str = "ya29.test-token";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Router plus handles for inspecting side effects.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub mailer: EmailSender,
    pub generator: GenerationGateway,
}

/// Create a test app over the in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_reply("Monday: squats 3x10")
}

/// Create a test app whose generator always answers `reply`.
#[allow(dead_code)]
pub fn create_test_app_with_reply(reply: &str) -> TestApp {
    let config = Config::test_default();
    let db = Database::in_memory();
    let mailer = EmailSender::new_capture(&config.email_from);
    let generator = GenerationGateway::new_static(reply);

    let mut profiles = HashMap::new();
    profiles.insert(
        GOOGLE_TEST_TOKEN.to_string(),
        ProviderProfile {
            email: "Social@Example.com".to_string(),
            name: Some("Social User".to_string()),
            image: Some("https://example.com/avatar.png".to_string()),
            email_verified: true,
        },
    );
    let identity = IdentityProvider::new_static(db.clone(), &config, profiles);

    let state = Arc::new(AppState {
        verification: VerificationService::new(db.clone(), mailer.clone()),
        workouts: WorkoutService::new(db.clone()),
        generator: generator.clone(),
        identity,
        db,
        config,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        mailer,
        generator,
    }
}

/// Session token for `email` signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(email: &str) -> String {
    create_jwt(email, &Config::test_default().jwt_signing_key).unwrap()
}

/// Build a JSON request, optionally with a bearer token.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a body-less request, optionally with a bearer token.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
