// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout generation route.

use crate::error::Result;
use crate::services::{GenerationOutput, GenerationRequest};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/generate-workout", post(generate_workout))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateWorkoutRequest {
    #[serde(default)]
    prompt: String,
    fitness_level: Option<String>,
    workout_goal: Option<String>,
    #[serde(default)]
    structured: bool,
}

#[derive(Serialize)]
pub struct GenerateWorkoutResponse {
    pub workout: GenerationOutput,
}

async fn generate_workout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateWorkoutRequest>,
) -> Result<Json<GenerateWorkoutResponse>> {
    let request = GenerationRequest {
        prompt: body.prompt,
        fitness_level: body.fitness_level,
        workout_goal: body.workout_goal,
        structured: body.structured,
    };

    let workout = state.generator.generate(&request).await?;
    Ok(Json(GenerateWorkoutResponse { workout }))
}
