//! crates/study_planner_core/src/error.rs
//!
//! Errors raised while deriving, placing or persisting a study schedule.

use chrono::NaiveDate;

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// A user-supplied parameter is outside its allowed set.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The computed start date is on or after the exam date.
    #[error("Start date {start} is on or after exam date {exam}: no time to study")]
    InfeasibleWindow { start: NaiveDate, exam: NaiveDate },

    /// Every date between start and exam falls on a rest day.
    #[error("No available study days between start and exam")]
    NoEligibleDays,

    /// Placement produced zero sessions. Unreachable while the derivation
    /// invariants hold.
    #[error("Failed to place any sessions for exam; this indicates a derivation bug")]
    EmptySchedule,

    #[error(transparent)]
    Port(#[from] PortError),
}
