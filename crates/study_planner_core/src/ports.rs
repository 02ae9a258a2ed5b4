//! crates/study_planner_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or LLM APIs.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    Exam, ExamUpdate, NewExam, NewStudySession, ProposedSession, RestDays,
    StudySession,
};
use crate::placement::PlacementRequest;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The record is not in the state the operation expected.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Boundary ---
    /// Resolves a browser auth session into the owning user's id.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    // --- Exam Management ---
    /// Fails with `NotFound` if the exam does not exist and `Unauthorized`
    /// if it belongs to another user.
    async fn get_exam_for_user(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<Exam>;

    /// All exams of the user, ordered by exam date.
    async fn list_exams(&self, user_id: Uuid) -> PortResult<Vec<Exam>>;

    async fn create_exam(&self, user_id: Uuid, exam: NewExam) -> PortResult<Exam>;

    /// Applies the edit, deletes the exam's sessions and resets its status to
    /// `NONE` in one transaction. Any running generation loses ownership.
    async fn update_exam(&self, exam_id: Uuid, user_id: Uuid, update: ExamUpdate)
        -> PortResult<Exam>;

    /// Deletes the exam together with its sessions.
    async fn delete_exam(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<()>;

    /// Deletes the exam's sessions and resets its status to `NONE` in one
    /// transaction. Any running generation loses ownership.
    async fn reset_schedule(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<()>;

    // --- User Settings ---
    async fn get_rest_days(&self, user_id: Uuid) -> PortResult<RestDays>;

    /// Stores the rest days and resets every exam of the user (sessions
    /// deleted, status `NONE`) in one transaction.
    async fn update_rest_days(&self, user_id: Uuid, rest_days: RestDays) -> PortResult<RestDays>;

    // --- Generation Status ---
    /// Atomic conditional update `NONE -> GENERATING`. On success returns a
    /// fresh generation id that owns the run until it commits, fails, or an
    /// edit resets the exam. Returns `None` when the exam is not `NONE`.
    async fn claim_generation(&self, exam_id: Uuid) -> PortResult<Option<Uuid>>;

    /// `NONE -> FAILED` with a reason, for failures detected before a run is
    /// claimed. Returns whether a row changed.
    async fn record_failure(&self, exam_id: Uuid, reason: &str) -> PortResult<bool>;

    /// `GENERATING -> FAILED`, only while `generation_id` still owns the run.
    async fn fail_generation(&self, exam_id: Uuid, generation_id: Uuid, reason: &str)
        -> PortResult<bool>;

    /// Replaces all of the exam's sessions and moves it from `GENERATING` to
    /// `GENERATED` in one transaction. Fails with `Conflict` (and changes
    /// nothing) when `generation_id` no longer owns the run.
    async fn commit_schedule(
        &self,
        exam_id: Uuid,
        generation_id: Uuid,
        sessions: Vec<NewStudySession>,
    ) -> PortResult<()>;

    // --- Study Sessions ---
    /// Sessions of the user's exams other than `exam_id`.
    async fn get_other_exam_sessions(&self, user_id: Uuid, exam_id: Uuid)
        -> PortResult<Vec<StudySession>>;

    async fn get_sessions_for_exam(&self, exam_id: Uuid, user_id: Uuid)
        -> PortResult<Vec<StudySession>>;

    /// Every session of the user planned on `date`, across all exams.
    async fn get_sessions_on(&self, user_id: Uuid, date: NaiveDate)
        -> PortResult<Vec<StudySession>>;
}

/// The external placement capability.
///
/// Output is untrusted: every candidate is strictly validated before use.
#[async_trait]
pub trait PlacementService: Send + Sync {
    /// Proposes concrete dates and methods for the locked session count.
    async fn propose(&self, request: &PlacementRequest) -> PortResult<Vec<ProposedSession>>;
}

