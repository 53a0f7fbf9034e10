// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Owner-scoped persistence of saved workout plans.

use crate::db::Database;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::SavedWorkout;
use chrono::Utc;

/// Longest accepted workout title, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

fn validate_title(title: &str) -> Result<&str, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title)
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Workout {} not found", id))
}

/// CRUD over saved workouts. Every call is filtered by the caller's email.
#[derive(Clone)]
pub struct WorkoutService {
    db: Database,
}

impl WorkoutService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn save(
        &self,
        owner: &AuthUser,
        title: &str,
        content: &str,
    ) -> Result<SavedWorkout, AppError> {
        let title = validate_title(title)?;
        if content.trim().is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let workout = SavedWorkout {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            user_email: owner.email.clone(),
            created_at: Utc::now(),
        };
        self.db.insert_workout(&workout).await?;

        tracing::info!(
            email = %owner.email,
            workout_id = %workout.id,
            content_len = workout.content.len(),
            "Workout saved"
        );
        Ok(workout)
    }

    /// Newest first.
    pub async fn list(&self, owner: &AuthUser) -> Result<Vec<SavedWorkout>, AppError> {
        self.db.list_workouts(&owner.email).await
    }

    pub async fn get(&self, owner: &AuthUser, id: &str) -> Result<SavedWorkout, AppError> {
        self.db
            .get_workout(id, &owner.email)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Only the title is mutable.
    pub async fn update_title(
        &self,
        owner: &AuthUser,
        id: &str,
        title: &str,
    ) -> Result<SavedWorkout, AppError> {
        let title = validate_title(title)?;
        let workout = self
            .db
            .update_workout_title(id, &owner.email, title)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!(email = %owner.email, workout_id = %id, "Workout renamed");
        Ok(workout)
    }

    pub async fn delete(&self, owner: &AuthUser, id: &str) -> Result<(), AppError> {
        if !self.db.delete_workout(id, &owner.email).await? {
            return Err(not_found(id));
        }

        tracing::info!(email = %owner.email, workout_id = %id, "Workout deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(email: &str) -> AuthUser {
        AuthUser {
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_requires_title_and_content() {
        let service = WorkoutService::new(Database::in_memory());
        let me = owner("me@example.com");

        let err = service.save(&me, "   ", "{}").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = service.save(&me, "Legs", "").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = service
            .save(&me, &"x".repeat(MAX_TITLE_CHARS + 1), "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_save_trims_title() {
        let service = WorkoutService::new(Database::in_memory());
        let saved = service
            .save(&owner("me@example.com"), "  Push day ", "plan")
            .await
            .unwrap();
        assert_eq!(saved.title, "Push day");
        assert_eq!(saved.user_email, "me@example.com");
    }

    #[tokio::test]
    async fn test_other_owner_cannot_touch_workout() {
        let service = WorkoutService::new(Database::in_memory());
        let alice = owner("alice@example.com");
        let mallory = owner("mallory@example.com");

        let saved = service.save(&alice, "Run club", "5k plan").await.unwrap();

        assert!(matches!(
            service.get(&mallory, &saved.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            service
                .update_title(&mallory, &saved.id, "Stolen")
                .await
                .unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            service.delete(&mallory, &saved.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(service.list(&mallory).await.unwrap().is_empty());

        let still_there = service.get(&alice, &saved.id).await.unwrap();
        assert_eq!(still_there.title, "Run club");
    }

    #[tokio::test]
    async fn test_second_delete_is_not_found() {
        let service = WorkoutService::new(Database::in_memory());
        let me = owner("me@example.com");
        let saved = service.save(&me, "Core", "plank").await.unwrap();

        service.delete(&me, &saved.id).await.unwrap();
        assert!(matches!(
            service.delete(&me, &saved.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
