// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod user;
pub mod verification;
pub mod workout;

pub use user::{normalize_email, User};
pub use verification::VerificationToken;
pub use workout::{DayWorkout, Exercise, SavedWorkout, WorkoutPlan, WEEKDAYS};
