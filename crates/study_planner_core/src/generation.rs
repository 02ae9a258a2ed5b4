//! crates/study_planner_core/src/generation.rs
//!
//! Runs the full schedule generation pipeline for one exam, guarded by the
//! exam's generation status.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::deriver::derive_schedule_inputs;
use crate::domain::NewStudySession;
use crate::error::ScheduleError;
use crate::placement::{PlacementOrchestrator, PlacementSource};
use crate::ports::{DatabaseService, PortError, PortResult};

/// The result of one `generate_schedule` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The replacement session set was persisted and the exam is `GENERATED`.
    Generated {
        session_count: usize,
        source: PlacementSource,
    },
    /// Generation did not produce a schedule. The reason is human-readable.
    Failed { error: String },
    /// The exam is not in `NONE`: another generation holds it or it already
    /// finished. Informational; callers must not retry automatically.
    AlreadyInProgress,
}

pub struct ScheduleGenerator {
    db: Arc<dyn DatabaseService>,
    orchestrator: PlacementOrchestrator,
}

impl ScheduleGenerator {
    pub fn new(db: Arc<dyn DatabaseService>, orchestrator: PlacementOrchestrator) -> Self {
        Self { db, orchestrator }
    }

    /// Generates and persists a schedule for `exam_id`.
    ///
    /// Returns `Err` only when the exam cannot be read (missing, not owned, or
    /// the store is unreachable before any state change). Everything after
    /// that is reported through [`GenerationOutcome`].
    #[instrument(skip(self, today))]
    pub async fn generate_schedule(
        &self,
        exam_id: Uuid,
        user_id: Uuid,
        today: NaiveDate,
    ) -> PortResult<GenerationOutcome> {
        let exam = self.db.get_exam_for_user(exam_id, user_id).await?;

        if exam.exam_date <= today {
            return Ok(past_exam_outcome());
        }

        // Parameter and feasibility errors never enter GENERATING.
        let rest_days = self.db.get_rest_days(user_id).await?;
        if let Err(e) = derive_schedule_inputs(&exam, &rest_days, &[], today) {
            return self.record_derivation_failure(exam_id, e).await;
        }

        let Some(generation_id) = self.db.claim_generation(exam_id).await? else {
            info!("Schedule generation already in progress or finished");
            return Ok(GenerationOutcome::AlreadyInProgress);
        };

        Ok(self.run(exam_id, user_id, generation_id, today).await)
    }

    /// Runs while `generation_id` owns the exam. The exam is read again so
    /// the plan reflects the parameters current at claim time.
    async fn run(
        &self,
        exam_id: Uuid,
        user_id: Uuid,
        generation_id: Uuid,
        today: NaiveDate,
    ) -> GenerationOutcome {
        let prepared = async {
            let exam = self.db.get_exam_for_user(exam_id, user_id).await?;
            if exam.exam_date <= today {
                return Err(ScheduleError::InvalidParameter(
                    "exam date is today or in the past".to_string(),
                ));
            }
            let rest_days = self.db.get_rest_days(user_id).await?;
            let other_sessions = self.db.get_other_exam_sessions(user_id, exam_id).await?;
            let inputs = derive_schedule_inputs(&exam, &rest_days, &other_sessions, today)?;
            Ok::<_, ScheduleError>((exam, inputs))
        }
        .await;

        let (exam, inputs) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return self.mark_failed(exam_id, generation_id, e).await,
        };

        let placement = match self.orchestrator.place(&exam, &inputs).await {
            Ok(placement) => placement,
            Err(e) => return self.mark_failed(exam_id, generation_id, e).await,
        };

        let session_count = placement.sessions.len();
        let sessions: Vec<NewStudySession> = placement
            .sessions
            .iter()
            .map(|s| NewStudySession::from_proposal(&exam, s))
            .collect();

        match self.db.commit_schedule(exam_id, generation_id, sessions).await {
            Ok(()) => {
                info!(
                    session_count,
                    source = ?placement.source,
                    %generation_id,
                    "Schedule generated"
                );
                GenerationOutcome::Generated {
                    session_count,
                    source: placement.source,
                }
            }
            Err(PortError::Conflict(reason)) => {
                // An edit reset the exam mid-generation; the plan is stale.
                warn!(%reason, %generation_id, "Discarding schedule for an exam edited during generation");
                GenerationOutcome::Failed {
                    error: "Exam was edited during schedule generation; please generate again."
                        .to_string(),
                }
            }
            Err(e) => self.mark_failed(exam_id, generation_id, ScheduleError::Port(e)).await,
        }
    }

    /// Records a failure detected before any run was claimed.
    async fn record_derivation_failure(
        &self,
        exam_id: Uuid,
        e: ScheduleError,
    ) -> PortResult<GenerationOutcome> {
        let reason = e.to_string();
        warn!(error = %reason, "Schedule inputs could not be derived");

        if !self.db.record_failure(exam_id, &reason).await? {
            return Ok(GenerationOutcome::AlreadyInProgress);
        }

        Ok(GenerationOutcome::Failed { error: reason })
    }

    async fn mark_failed(
        &self,
        exam_id: Uuid,
        generation_id: Uuid,
        e: ScheduleError,
    ) -> GenerationOutcome {
        let reason = e.to_string();
        error!(error = %reason, %generation_id, "Schedule generation failed");

        match self.db.fail_generation(exam_id, generation_id, &reason).await {
            Ok(true) => {}
            Ok(false) => warn!(%generation_id, "Run no longer owns the exam; FAILED not recorded"),
            Err(status_err) => error!(error = %status_err, "Failed to record FAILED generation status"),
        }

        GenerationOutcome::Failed { error: reason }
    }
}

fn past_exam_outcome() -> GenerationOutcome {
    GenerationOutcome::Failed {
        error: "Cannot create schedule: exam date is today or in the past.".to_string(),
    }
}
