//! Database layer (Firestore, or an in-process store for local dev and tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{SavedWorkout, User, VerificationToken};
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Keyed by target email; one live code per address
    pub const VERIFICATION_TOKENS: &str = "verification_tokens";
    pub const SAVED_WORKOUTS: &str = "saved_workouts";
}

/// Result of trying to redeem a verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Code matched; the user is now verified and the code is gone.
    Verified,
    /// No live code matching `(email, code)`.
    NoMatchingToken,
    /// Code matched but no user exists for the email; the code is kept.
    UnknownUser,
}

/// Storage facade used by the services.
///
/// All methods take normalized emails. Workout reads and writes are always
/// scoped by `(id, owner)`.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

impl Database {
    /// Fresh, empty in-memory database.
    pub fn in_memory() -> Self {
        Database::Memory(MemoryDb::default())
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        match self {
            Database::Firestore(db) => db.get_user(email).await,
            Database::Memory(db) => db.get_user(email),
        }
    }

    /// Insert a new user; `Conflict` if the email is already registered.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.create_user(user).await,
            Database::Memory(db) => db.create_user(user),
        }
    }

    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.upsert_user(user).await,
            Database::Memory(db) => db.upsert_user(user),
        }
    }

    // ─── Verification Tokens ─────────────────────────────────────

    /// Store a code, replacing any outstanding code for the same email.
    pub async fn put_verification_token(&self, token: &VerificationToken) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.put_verification_token(token).await,
            Database::Memory(db) => db.put_verification_token(token),
        }
    }

    pub async fn get_verification_token(
        &self,
        email: &str,
    ) -> Result<Option<VerificationToken>, AppError> {
        match self {
            Database::Firestore(db) => db.get_verification_token(email).await,
            Database::Memory(db) => db.get_verification_token(email),
        }
    }

    /// Atomically consume a matching live code and mark the user verified.
    pub async fn redeem_verification_token(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, AppError> {
        match self {
            Database::Firestore(db) => db.redeem_verification_token(email, code, now).await,
            Database::Memory(db) => db.redeem_verification_token(email, code, now),
        }
    }

    // ─── Saved Workouts ──────────────────────────────────────────

    pub async fn insert_workout(&self, workout: &SavedWorkout) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.insert_workout(workout).await,
            Database::Memory(db) => db.insert_workout(workout),
        }
    }

    /// Owner's workouts, newest first.
    pub async fn list_workouts(&self, owner: &str) -> Result<Vec<SavedWorkout>, AppError> {
        match self {
            Database::Firestore(db) => db.list_workouts(owner).await,
            Database::Memory(db) => db.list_workouts(owner),
        }
    }

    pub async fn get_workout(
        &self,
        id: &str,
        owner: &str,
    ) -> Result<Option<SavedWorkout>, AppError> {
        match self {
            Database::Firestore(db) => db.get_workout(id, owner).await,
            Database::Memory(db) => db.get_workout(id, owner),
        }
    }

    /// Returns the updated workout, or `None` if `(id, owner)` does not exist.
    pub async fn update_workout_title(
        &self,
        id: &str,
        owner: &str,
        title: &str,
    ) -> Result<Option<SavedWorkout>, AppError> {
        match self {
            Database::Firestore(db) => db.update_workout_title(id, owner, title).await,
            Database::Memory(db) => db.update_workout_title(id, owner, title),
        }
    }

    /// Returns `false` if `(id, owner)` does not exist.
    pub async fn delete_workout(&self, id: &str, owner: &str) -> Result<bool, AppError> {
        match self {
            Database::Firestore(db) => db.delete_workout(id, owner).await,
            Database::Memory(db) => db.delete_workout(id, owner),
        }
    }
}
