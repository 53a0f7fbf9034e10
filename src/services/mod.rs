// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod email;
pub mod generation;
pub mod identity;
pub mod verification;
pub mod workouts;

pub use email::{EmailSender, OutgoingEmail};
pub use generation::{GenerationGateway, GenerationOutput, GenerationRequest};
pub use identity::{IdentityProvider, LoginMethod, OAuthProvider, ProviderProfile};
pub use verification::VerificationService;
pub use workouts::WorkoutService;
