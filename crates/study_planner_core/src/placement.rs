//! crates/study_planner_core/src/placement.rs
//!
//! Places the locked number of sessions on concrete dates. A proposal from the
//! external placement capability is accepted only if it passes strict
//! validation; otherwise the deterministic generator is used.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::deriver::{ScheduleInputs, WeekBucket};
use crate::distribution::distribute;
use crate::domain::{Exam, ProposedSession};
use crate::error::ScheduleError;
use crate::ports::PlacementService;

/// Time budget for one call to the placement capability.
pub const DEFAULT_PLACEMENT_TIMEOUT: Duration = Duration::from_secs(30);

//=========================================================================================
// Placement Request
//=========================================================================================

/// Values no placement step may alter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedConstraints {
    pub total_session_count: u32,
    pub session_duration_minutes: u32,
    pub target_sessions_per_week: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamMeta {
    pub title: String,
    pub subject: Option<String>,
    /// Soft hint, passed through untouched. Has no effect on the fallback.
    pub preferences: Option<String>,
    pub exam_date: NaiveDate,
    pub study_methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConstraints {
    pub available_dates: Vec<NaiveDate>,
    pub week_breakdown: Vec<WeekBucket>,
    pub existing_minutes_by_date: BTreeMap<NaiveDate, u32>,
    pub rest_days: Vec<String>,
    pub days_to_exam: i64,
}

/// Everything offered to the placement capability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    pub locked: LockedConstraints,
    pub exam: ExamMeta,
    pub constraints: PlacementConstraints,
}

impl PlacementRequest {
    pub fn new(exam: &Exam, inputs: &ScheduleInputs) -> Self {
        Self {
            locked: LockedConstraints {
                total_session_count: inputs.total_sessions_needed,
                session_duration_minutes: inputs.session_length_minutes,
                target_sessions_per_week: inputs.target_sessions_per_week,
            },
            exam: ExamMeta {
                title: exam.title.clone(),
                subject: exam.subject.clone(),
                preferences: exam.preferences.clone(),
                exam_date: exam.exam_date,
                study_methods: exam.study_methods.clone(),
            },
            constraints: PlacementConstraints {
                available_dates: inputs.available_dates.clone(),
                week_breakdown: inputs.week_breakdown.clone(),
                existing_minutes_by_date: inputs.existing_minutes_by_date.clone(),
                rest_days: inputs.rest_days.names(),
                days_to_exam: inputs.days_to_exam,
            },
        }
    }
}

//=========================================================================================
// Strict Validation
//=========================================================================================

/// The first rule a candidate schedule violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("expected {expected} sessions, got {actual}")]
    SessionCount { expected: u32, actual: usize },
    #[error("session on {date} lasts {actual} minutes instead of {expected}")]
    Duration {
        date: NaiveDate,
        expected: u32,
        actual: u32,
    },
    #[error("{0} is not an available study date")]
    DateNotAvailable(NaiveDate),
    #[error("'{0}' is not one of the exam's study methods")]
    UnknownMethod(String),
    #[error("week {week_index} has {actual} sessions instead of {expected}")]
    WeekQuota {
        week_index: usize,
        expected: u32,
        actual: u32,
    },
    #[error("first study day {0} has no session")]
    FirstDayUncovered(NaiveDate),
    #[error("last study day {0} has no session")]
    LastDayUncovered(NaiveDate),
}

/// Checks a candidate against every locked rule and returns it sorted by date.
///
/// All-or-nothing: a single violation rejects the whole candidate.
pub fn strict_validate(
    mut candidate: Vec<ProposedSession>,
    inputs: &ScheduleInputs,
    study_methods: &[String],
) -> Result<Vec<ProposedSession>, ValidationError> {
    let expected = inputs.total_sessions_needed;
    if candidate.len() != expected as usize {
        return Err(ValidationError::SessionCount {
            expected,
            actual: candidate.len(),
        });
    }

    for session in &candidate {
        if session.duration_minutes != inputs.session_length_minutes {
            return Err(ValidationError::Duration {
                date: session.date,
                expected: inputs.session_length_minutes,
                actual: session.duration_minutes,
            });
        }
    }

    for session in &candidate {
        if inputs.available_dates.binary_search(&session.date).is_err() {
            return Err(ValidationError::DateNotAvailable(session.date));
        }
    }

    for session in &candidate {
        if !study_methods.contains(&session.method) {
            return Err(ValidationError::UnknownMethod(session.method.clone()));
        }
    }

    for bucket in &inputs.week_breakdown {
        let actual = candidate.iter().filter(|s| bucket.contains(s.date)).count() as u32;
        if actual != bucket.session_count {
            return Err(ValidationError::WeekQuota {
                week_index: bucket.week_index,
                expected: bucket.session_count,
                actual,
            });
        }
    }

    if let Some(first) = inputs.first_study_day() {
        if !candidate.iter().any(|s| s.date == first) {
            return Err(ValidationError::FirstDayUncovered(first));
        }
    }
    if let Some(last) = inputs.last_study_day() {
        if !candidate.iter().any(|s| s.date == last) {
            return Err(ValidationError::LastDayUncovered(last));
        }
    }

    candidate.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(candidate)
}

//=========================================================================================
// Deterministic Generator
//=========================================================================================

/// Builds a schedule from the week breakdown alone.
///
/// Pure: identical inputs give identical output. Methods are assigned
/// round-robin across the whole plan, never restarting per week.
pub fn generate_deterministic_schedule(
    inputs: &ScheduleInputs,
    study_methods: &[String],
) -> Vec<ProposedSession> {
    if study_methods.is_empty() {
        return Vec::new();
    }

    let first = inputs.first_study_day();
    let last = inputs.last_study_day();
    let mut sessions = Vec::with_capacity(inputs.total_sessions_needed as usize);
    let mut method_index = 0usize;

    for bucket in &inputs.week_breakdown {
        let mut pinned = Vec::with_capacity(2);
        if bucket.first_day().is_some() && bucket.first_day() == first {
            pinned.extend(first);
        }
        if bucket.last_day().is_some() && bucket.last_day() == last {
            pinned.extend(last);
        }

        let counts = distribute(&bucket.study_days, bucket.session_count, &pinned);
        for (date, count) in counts {
            for _ in 0..count {
                sessions.push(ProposedSession {
                    date,
                    duration_minutes: inputs.session_length_minutes,
                    method: study_methods[method_index % study_methods.len()].clone(),
                });
                method_index += 1;
            }
        }
    }

    sessions
}

//=========================================================================================
// Orchestrator
//=========================================================================================

/// Where the final schedule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSource {
    /// The external proposal passed strict validation.
    Proposal,
    /// The deterministic generator was used.
    Deterministic,
}

#[derive(Debug, Clone)]
pub struct Placement {
    /// Sorted by date, never empty.
    pub sessions: Vec<ProposedSession>,
    pub source: PlacementSource,
}

/// Chooses between an external proposal and the deterministic generator.
#[derive(Clone)]
pub struct PlacementOrchestrator {
    service: Option<Arc<dyn PlacementService>>,
    timeout: Duration,
}

impl PlacementOrchestrator {
    pub fn new(service: Arc<dyn PlacementService>, timeout: Duration) -> Self {
        Self {
            service: Some(service),
            timeout,
        }
    }

    /// An orchestrator that never consults an external capability.
    pub fn deterministic() -> Self {
        Self {
            service: None,
            timeout: DEFAULT_PLACEMENT_TIMEOUT,
        }
    }

    pub async fn place(
        &self,
        exam: &Exam,
        inputs: &ScheduleInputs,
    ) -> Result<Placement, ScheduleError> {
        let proposal = match &self.service {
            Some(service) => self.request_proposal(service.as_ref(), exam, inputs).await,
            None => None,
        };

        let placement = match proposal {
            Some(sessions) => Placement {
                sessions,
                source: PlacementSource::Proposal,
            },
            None => Placement {
                sessions: generate_deterministic_schedule(inputs, &exam.study_methods),
                source: PlacementSource::Deterministic,
            },
        };

        if placement.sessions.is_empty() {
            error!(
                exam_id = %exam.id,
                total_sessions_needed = inputs.total_sessions_needed,
                available_dates = inputs.available_dates.len(),
                days_to_exam = inputs.days_to_exam,
                "CRITICAL: schedule placement produced 0 sessions"
            );
            return Err(ScheduleError::EmptySchedule);
        }

        Ok(placement)
    }

    /// Returns a validated proposal, or `None` on any failure.
    async fn request_proposal(
        &self,
        service: &dyn PlacementService,
        exam: &Exam,
        inputs: &ScheduleInputs,
    ) -> Option<Vec<ProposedSession>> {
        let request = PlacementRequest::new(exam, inputs);

        let candidate = match tokio::time::timeout(self.timeout, service.propose(&request)).await {
            Err(_) => {
                warn!(
                    exam_id = %exam.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Placement capability timed out; using deterministic fallback"
                );
                return None;
            }
            Ok(Err(e)) => {
                warn!(exam_id = %exam.id, error = %e, "Placement capability failed; using deterministic fallback");
                return None;
            }
            Ok(Ok(candidate)) => candidate,
        };

        match strict_validate(candidate, inputs, &exam.study_methods) {
            Ok(sessions) => {
                debug!(exam_id = %exam.id, sessions = sessions.len(), "Accepted placement proposal");
                Some(sessions)
            }
            Err(rule) => {
                warn!(
                    exam_id = %exam.id,
                    rule = %rule,
                    "Placement proposal failed strict validation; using deterministic fallback"
                );
                None
            }
        }
    }
}
