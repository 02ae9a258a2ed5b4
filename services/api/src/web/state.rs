//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;
use study_planner_core::{ports::DatabaseService, ScheduleGenerator};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    /// Runs the generation pipeline; shares `db` with the handlers.
    pub generator: Arc<ScheduleGenerator>,
}
