// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Saved workout routes (require authentication).

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::SavedWorkout;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workouts/save", post(save_workout))
        .route("/workouts/saved", get(list_workouts))
        .route(
            "/workouts/{id}",
            get(get_workout).patch(rename_workout).delete(delete_workout),
        )
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub user_email: String,
    pub created_at: String,
}

impl From<SavedWorkout> for WorkoutResponse {
    fn from(w: SavedWorkout) -> Self {
        Self {
            id: w.id,
            title: w.title,
            content: w.content,
            user_email: w.user_email,
            created_at: format_utc_rfc3339(w.created_at),
        }
    }
}

#[derive(Serialize)]
pub struct WorkoutEnvelope {
    pub workout: WorkoutResponse,
}

#[derive(Serialize)]
pub struct WorkoutListResponse {
    pub workouts: Vec<WorkoutResponse>,
}

#[derive(Serialize)]
pub struct DeleteWorkoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize)]
pub struct SaveWorkoutRequest {
    #[serde(default)]
    title: String,
    /// A string is stored verbatim; any other JSON value is stored serialized.
    #[serde(default)]
    content: serde_json::Value,
}

#[derive(Deserialize)]
pub struct RenameWorkoutRequest {
    #[serde(default)]
    title: String,
}

fn content_to_string(content: serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ─── Handlers ────────────────────────────────────────────────

async fn save_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SaveWorkoutRequest>,
) -> Result<Json<WorkoutEnvelope>> {
    let content = content_to_string(body.content);
    let workout = state.workouts.save(&user, &body.title, &content).await?;

    Ok(Json(WorkoutEnvelope {
        workout: workout.into(),
    }))
}

async fn list_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<WorkoutListResponse>> {
    let workouts = state.workouts.list(&user).await?;

    Ok(Json(WorkoutListResponse {
        workouts: workouts.into_iter().map(Into::into).collect(),
    }))
}

async fn get_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<WorkoutEnvelope>> {
    let workout = state.workouts.get(&user, &id).await?;
    Ok(Json(WorkoutEnvelope {
        workout: workout.into(),
    }))
}

async fn rename_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<RenameWorkoutRequest>,
) -> Result<Json<WorkoutEnvelope>> {
    let workout = state.workouts.update_title(&user, &id, &body.title).await?;
    Ok(Json(WorkoutEnvelope {
        workout: workout.into(),
    }))
}

async fn delete_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteWorkoutResponse>> {
    state.workouts.delete(&user, &id).await?;
    Ok(Json(DeleteWorkoutResponse {
        success: true,
        message: "Workout deleted successfully".to_string(),
    }))
}
