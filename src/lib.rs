// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WORKOUT.IO: AI-assisted workout planning backend
//!
//! This crate provides the HTTP API for email verification, saved workout
//! plans, and workout generation through a large language model.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{GenerationGateway, IdentityProvider, VerificationService, WorkoutService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub verification: VerificationService,
    pub workouts: WorkoutService,
    pub generator: GenerationGateway,
    pub identity: IdentityProvider,
}
