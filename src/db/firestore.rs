// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (keyed by normalized email)
//! - Verification tokens (keyed by target email)
//! - Saved workouts (keyed by UUID, owner stored in `user_email`)
//!
//! Listing workouts needs a composite index on
//! `saved_workouts(user_email ASC, created_at DESC)`.

use crate::db::{collections, RedeemOutcome};
use crate::error::AppError;
use crate::models::{SavedWorkout, User, VerificationToken};
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_offline() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by normalized email.
    pub async fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a user, failing with `Conflict` if the email is taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        if self.get_user(&user.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.email)
            .object(user)
            .execute()
            .await
            .map_err(user_insert_error)?;
        Ok(())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.email)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Verification Token Operations ───────────────────────────

    /// Store a verification code. Overwrites any previous code for the email.
    pub async fn put_verification_token(&self, token: &VerificationToken) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::VERIFICATION_TOKENS)
            .document_id(&token.identifier)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get the outstanding verification code for an email.
    pub async fn get_verification_token(
        &self,
        email: &str,
    ) -> Result<Option<VerificationToken>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VERIFICATION_TOKENS)
            .obj()
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Consume a live matching code and mark the user verified in one transaction.
    ///
    /// Both writes (user update, token delete) commit together or not at all.
    pub async fn redeem_verification_token(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // 1. Check the code, remembering which version of the token was read
        let token_doc = client
            .fluent()
            .select()
            .by_id_in(collections::VERIFICATION_TOKENS)
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let Some(token_doc) = token_doc else {
            let _ = transaction.rollback().await;
            return Ok(RedeemOutcome::NoMatchingToken);
        };
        let token: VerificationToken = firestore::FirestoreDb::deserialize_doc_to(&token_doc)
            .map_err(|e| AppError::Database(e.to_string()))?;
        if !token.matches(code, now) {
            let _ = transaction.rollback().await;
            return Ok(RedeemOutcome::NoMatchingToken);
        }
        let token_precondition = match token_doc.update_time.clone() {
            Some(ts) => firestore::FirestoreWritePrecondition::UpdateTime(
                firestore::timestamp_utils::from_timestamp(ts)
                    .map_err(|e| AppError::Database(e.to_string()))?,
            ),
            None => firestore::FirestoreWritePrecondition::Exists(true),
        };

        // 2. Load the user
        let Some(mut user) = self.get_user(email).await? else {
            let _ = transaction.rollback().await;
            return Ok(RedeemOutcome::UnknownUser);
        };
        user.email_verified = Some(now);

        // 3. Stage user update and token delete
        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(email)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user update to transaction: {}", e))
            })?;

        client
            .fluent()
            .delete()
            .from(collections::VERIFICATION_TOKENS)
            .document_id(email)
            // Fails the commit if the token was consumed or replaced since it was read.
            .precondition(token_precondition)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add token delete to transaction: {}", e))
            })?;

        // 4. Commit atomically
        match transaction.commit().await {
            Ok(_) => Ok(RedeemOutcome::Verified),
            Err(e) if is_stale_write(&e) => {
                tracing::info!(email = %email, "Verification token changed during redeem");
                Ok(RedeemOutcome::NoMatchingToken)
            }
            Err(e) => Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            ))),
        }
    }

    // ─── Saved Workout Operations ────────────────────────────────

    /// Store a new workout.
    pub async fn insert_workout(&self, workout: &SavedWorkout) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::SAVED_WORKOUTS)
            .document_id(&workout.id)
            .object(workout)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all workouts owned by `owner`, most recent first.
    pub async fn list_workouts(&self, owner: &str) -> Result<Vec<SavedWorkout>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SAVED_WORKOUTS)
            .filter(|q| q.for_all([q.field("user_email").eq(owner)]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a workout by ID, only if it belongs to `owner`.
    pub async fn get_workout(
        &self,
        id: &str,
        owner: &str,
    ) -> Result<Option<SavedWorkout>, AppError> {
        let workout: Option<SavedWorkout> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SAVED_WORKOUTS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(workout.filter(|w| w.user_email == owner))
    }

    /// Rename a workout owned by `owner`.
    pub async fn update_workout_title(
        &self,
        id: &str,
        owner: &str,
        title: &str,
    ) -> Result<Option<SavedWorkout>, AppError> {
        // Fetch-modify-write to preserve other fields
        let Some(mut workout) = self.get_workout(id, owner).await? else {
            return Ok(None);
        };
        workout.title = title.to_string();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SAVED_WORKOUTS)
            .document_id(&workout.id)
            .object(&workout)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Some(workout))
    }

    /// Delete a workout owned by `owner`.
    pub async fn delete_workout(&self, id: &str, owner: &str) -> Result<bool, AppError> {
        if self.get_workout(id, owner).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SAVED_WORKOUTS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }
}

/// Map a failed user insert. A concurrent registration that won the race
/// surfaces as a data conflict.
fn user_insert_error(e: FirestoreError) -> AppError {
    match e {
        FirestoreError::DataConflictError(_) => {
            AppError::Conflict("Email already registered".to_string())
        }
        other => AppError::Database(other.to_string()),
    }
}

/// A write precondition that no longer holds: the document is gone or was rewritten.
fn is_stale_write(e: &FirestoreError) -> bool {
    match e {
        FirestoreError::DataNotFoundError(_) => true,
        FirestoreError::DatabaseError(err) => err.public.code == "FailedPrecondition",
        _ => false,
    }
}
