//! In-process store backed by `DashMap`.
//!
//! Used for local development (`STORAGE_BACKEND=memory`) and tests. Data is
//! lost on restart.

use crate::db::RedeemOutcome;
use crate::error::AppError;
use crate::models::{SavedWorkout, User, VerificationToken};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    tokens: Arc<DashMap<String, VerificationToken>>,
    workouts: Arc<DashMap<String, SavedWorkout>>,
}

impl MemoryDb {
    pub fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(email).map(|u| u.clone()))
    }

    pub fn create_user(&self, user: &User) -> Result<(), AppError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict("Email already registered".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    pub fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    pub fn put_verification_token(&self, token: &VerificationToken) -> Result<(), AppError> {
        self.tokens.insert(token.identifier.clone(), token.clone());
        Ok(())
    }

    pub fn get_verification_token(
        &self,
        email: &str,
    ) -> Result<Option<VerificationToken>, AppError> {
        Ok(self.tokens.get(email).map(|t| t.clone()))
    }

    pub fn redeem_verification_token(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, AppError> {
        // remove_if is atomic per key: two concurrent redeems cannot both win.
        let Some((_, token)) = self.tokens.remove_if(email, |_, t| t.matches(code, now)) else {
            return Ok(RedeemOutcome::NoMatchingToken);
        };

        match self.users.get_mut(email) {
            Some(mut user) => {
                user.email_verified = Some(now);
                Ok(RedeemOutcome::Verified)
            }
            None => {
                // Put the code back unless a newer one was issued meanwhile.
                self.tokens.entry(email.to_string()).or_insert(token);
                Ok(RedeemOutcome::UnknownUser)
            }
        }
    }

    pub fn insert_workout(&self, workout: &SavedWorkout) -> Result<(), AppError> {
        match self.workouts.entry(workout.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Database(format!(
                "Workout {} already exists",
                workout.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(workout.clone());
                Ok(())
            }
        }
    }

    pub fn list_workouts(&self, owner: &str) -> Result<Vec<SavedWorkout>, AppError> {
        let mut workouts: Vec<SavedWorkout> = self
            .workouts
            .iter()
            .filter(|w| w.user_email == owner)
            .map(|w| w.clone())
            .collect();
        workouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(workouts)
    }

    pub fn get_workout(&self, id: &str, owner: &str) -> Result<Option<SavedWorkout>, AppError> {
        Ok(self
            .workouts
            .get(id)
            .filter(|w| w.user_email == owner)
            .map(|w| w.clone()))
    }

    pub fn update_workout_title(
        &self,
        id: &str,
        owner: &str,
        title: &str,
    ) -> Result<Option<SavedWorkout>, AppError> {
        match self.workouts.get_mut(id) {
            Some(mut workout) if workout.user_email == owner => {
                workout.title = title.to_string();
                Ok(Some(workout.clone()))
            }
            _ => Ok(None),
        }
    }

    pub fn delete_workout(&self, id: &str, owner: &str) -> Result<bool, AppError> {
        Ok(self
            .workouts
            .remove_if(id, |_, w| w.user_email == owner)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(email: &str) -> User {
        User {
            email: email.to_string(),
            name: None,
            hashed_password: None,
            email_verified: None,
            image: None,
            created_at: Utc::now(),
        }
    }

    fn workout(id: &str, owner: &str, created_at: DateTime<Utc>) -> SavedWorkout {
        SavedWorkout {
            id: id.to_string(),
            title: format!("Workout {id}"),
            content: "{}".to_string(),
            user_email: owner.to_string(),
            created_at,
        }
    }

    #[test]
    fn test_create_user_conflict() {
        let db = MemoryDb::default();
        db.create_user(&user("a@example.com")).unwrap();
        let err = db.create_user(&user("a@example.com")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_redeem_consumes_token_once() {
        let db = MemoryDb::default();
        let now = Utc::now();
        db.create_user(&user("a@example.com")).unwrap();
        db.put_verification_token(&VerificationToken {
            identifier: "a@example.com".to_string(),
            token: "654321".to_string(),
            expires: now + Duration::minutes(10),
        })
        .unwrap();

        assert_eq!(
            db.redeem_verification_token("a@example.com", "654321", now)
                .unwrap(),
            RedeemOutcome::Verified
        );
        assert!(db.get_user("a@example.com").unwrap().unwrap().is_verified());
        assert_eq!(
            db.redeem_verification_token("a@example.com", "654321", now)
                .unwrap(),
            RedeemOutcome::NoMatchingToken
        );
    }

    #[test]
    fn test_redeem_unknown_user_keeps_token() {
        let db = MemoryDb::default();
        let now = Utc::now();
        db.put_verification_token(&VerificationToken {
            identifier: "ghost@example.com".to_string(),
            token: "111111".to_string(),
            expires: now + Duration::minutes(10),
        })
        .unwrap();

        assert_eq!(
            db.redeem_verification_token("ghost@example.com", "111111", now)
                .unwrap(),
            RedeemOutcome::UnknownUser
        );
        assert!(db
            .get_verification_token("ghost@example.com")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_workouts_are_owner_scoped() {
        let db = MemoryDb::default();
        let now = Utc::now();
        db.insert_workout(&workout("1", "a@example.com", now)).unwrap();
        db.insert_workout(&workout("2", "b@example.com", now)).unwrap();

        assert!(db.get_workout("2", "a@example.com").unwrap().is_none());
        assert!(db
            .update_workout_title("2", "a@example.com", "mine now")
            .unwrap()
            .is_none());
        assert!(!db.delete_workout("2", "a@example.com").unwrap());
        assert_eq!(
            db.get_workout("2", "b@example.com").unwrap().unwrap().title,
            "Workout 2"
        );
    }

    #[test]
    fn test_list_is_newest_first() {
        let db = MemoryDb::default();
        let now = Utc::now();
        db.insert_workout(&workout("old", "a@example.com", now - Duration::hours(1)))
            .unwrap();
        db.insert_workout(&workout("new", "a@example.com", now))
            .unwrap();
        db.insert_workout(&workout("mid", "a@example.com", now - Duration::minutes(5)))
            .unwrap();

        let ids: Vec<String> = db
            .list_workouts("a@example.com")
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
