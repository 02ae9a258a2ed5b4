//! services/api/src/web/schedule.rs
//!
//! Handlers that generate and reset an exam's study schedule.

use crate::web::{
    rest::{port_error_response, HandlerError},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use study_planner_core::{GenerationOutcome, PlacementSource};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// The result of a generation request that ran the pipeline.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateScheduleResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_count: Option<usize>,
    /// `proposal` or `deterministic`.
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Returned when the exam is already being generated or already has a
/// schedule. Clients should not retry automatically.
#[derive(Debug, Serialize, ToSchema)]
pub struct AlreadyInProgressResponse {
    status: String,
}

fn source_label(source: PlacementSource) -> &'static str {
    match source {
        PlacementSource::Proposal => "proposal",
        PlacementSource::Deterministic => "deterministic",
    }
}

/// Maps a pipeline outcome to its HTTP response.
pub fn outcome_response(outcome: GenerationOutcome) -> Response {
    match outcome {
        GenerationOutcome::Generated {
            session_count,
            source,
        } => Json(GenerateScheduleResponse {
            success: true,
            session_count: Some(session_count),
            source: Some(source_label(source).to_string()),
            error: None,
        })
        .into_response(),
        GenerationOutcome::Failed { error } => Json(GenerateScheduleResponse {
            success: false,
            session_count: None,
            source: None,
            error: Some(error),
        })
        .into_response(),
        GenerationOutcome::AlreadyInProgress => (
            StatusCode::CONFLICT,
            Json(AlreadyInProgressResponse {
                status: "already_in_progress".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Generate the study schedule for an exam.
///
/// Only exams in status `NONE` are generated; edit the exam or reset its
/// schedule to generate again.
#[utoipa::path(
    post,
    path = "/exams/{id}/schedule",
    params(("id" = Uuid, Path, description = "The exam id.")),
    responses(
        (status = 200, description = "Generation ran; see `success`", body = GenerateScheduleResponse),
        (status = 404, description = "Exam not found"),
        (status = 409, description = "Generation already in progress or finished", body = AlreadyInProgressResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn generate_schedule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(exam_id): Path<Uuid>,
) -> Result<Response, HandlerError> {
    let today = Utc::now().date_naive();
    let outcome = app_state
        .generator
        .generate_schedule(exam_id, user_id, today)
        .await
        .map_err(port_error_response)?;

    Ok(outcome_response(outcome))
}

/// Delete the exam's schedule and reset its status to `NONE`.
#[utoipa::path(
    delete,
    path = "/exams/{id}/schedule",
    params(("id" = Uuid, Path, description = "The exam id.")),
    responses(
        (status = 204, description = "Schedule reset"),
        (status = 404, description = "Exam not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn reset_schedule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(exam_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .db
        .reset_schedule(exam_id, user_id)
        .await
        .map_err(port_error_response)?;

    info!(%exam_id, "Schedule reset");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_in_progress_is_a_conflict() {
        let response = outcome_response(GenerationOutcome::AlreadyInProgress);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn failed_generation_is_still_ok() {
        let response = outcome_response(GenerationOutcome::Failed {
            error: "No available study days between start and exam".to_string(),
        });
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn generated_response_omits_error() {
        let body = serde_json::to_value(GenerateScheduleResponse {
            success: true,
            session_count: Some(11),
            source: Some(source_label(PlacementSource::Deterministic).to_string()),
            error: None,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": true, "sessionCount": 11, "source": "deterministic"})
        );
    }
}
