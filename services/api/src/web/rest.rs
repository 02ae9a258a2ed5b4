//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the exam endpoints, the payload structs
//! shared by all REST handlers and the master OpenAPI document.

use crate::web::{schedule, settings, state::AppState, today};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_planner_core::{
    domain::{Exam, ExamUpdate, NewExam, StudySession},
    ports::PortError,
    ScheduleError,
};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_exams_handler,
        create_exam_handler,
        update_exam_handler,
        delete_exam_handler,
        list_sessions_handler,
        schedule::generate_schedule_handler,
        schedule::reset_schedule_handler,
        settings::get_rest_days_handler,
        settings::update_rest_days_handler,
        today::today_handler,
    ),
    components(
        schemas(
            CreateExamRequest,
            UpdateExamRequest,
            ExamResponse,
            StudySessionResponse,
            schedule::GenerateScheduleResponse,
            schedule::AlreadyInProgressResponse,
            settings::RestDaysPayload,
            today::TodayResponse,
            today::TodaySessionResponse,
            today::UpcomingExamResponse,
        )
    ),
    tags(
        (name = "Study Planner API", description = "Exam management and study schedule generation.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

pub type HandlerError = (StatusCode, String);

/// Maps a port failure to an HTTP error. Exams owned by someone else are
/// reported as missing.
pub fn port_error_response(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => (StatusCode::NOT_FOUND, "Exam not found".to_string()),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unexpected(msg) => {
            error!("Unexpected port error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}

pub fn validation_error_response(e: ScheduleError) -> HandlerError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The payload for creating an exam.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    pub title: String,
    pub subject: Option<String>,
    pub study_methods: Vec<String>,
    pub preferences: Option<String>,
    pub exam_date: NaiveDate,
    pub target_sessions_per_week: u32,
    /// One of 30, 45, 60, 90 or 120.
    pub session_length_minutes: u32,
    /// e.g. `tomorrow`, `in_2_days`, `next_week`, `2_weeks_before`.
    pub when_to_start_studying: String,
}

impl From<CreateExamRequest> for NewExam {
    fn from(r: CreateExamRequest) -> Self {
        NewExam {
            title: r.title,
            subject: r.subject,
            study_methods: r.study_methods,
            preferences: r.preferences,
            exam_date: r.exam_date,
            target_sessions_per_week: r.target_sessions_per_week,
            session_length_minutes: r.session_length_minutes,
            when_to_start_studying: r.when_to_start_studying,
        }
    }
}

/// A partial edit; omitted fields stay unchanged. Any edit discards the
/// exam's current schedule.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamRequest {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub study_methods: Option<Vec<String>>,
    pub preferences: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub target_sessions_per_week: Option<u32>,
    pub session_length_minutes: Option<u32>,
    pub when_to_start_studying: Option<String>,
}

impl From<UpdateExamRequest> for ExamUpdate {
    fn from(r: UpdateExamRequest) -> Self {
        ExamUpdate {
            title: r.title,
            subject: r.subject,
            study_methods: r.study_methods,
            preferences: r.preferences,
            exam_date: r.exam_date,
            target_sessions_per_week: r.target_sessions_per_week,
            session_length_minutes: r.session_length_minutes,
            when_to_start_studying: r.when_to_start_studying,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamResponse {
    id: Uuid,
    title: String,
    subject: Option<String>,
    study_methods: Vec<String>,
    preferences: Option<String>,
    exam_date: NaiveDate,
    target_sessions_per_week: u32,
    session_length_minutes: u32,
    when_to_start_studying: String,
    /// `NONE`, `GENERATING`, `GENERATED` or `FAILED`.
    generation_status: String,
    generation_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<Exam> for ExamResponse {
    fn from(e: Exam) -> Self {
        Self {
            id: e.id,
            title: e.title,
            subject: e.subject,
            study_methods: e.study_methods,
            preferences: e.preferences,
            exam_date: e.exam_date,
            target_sessions_per_week: e.target_sessions_per_week,
            session_length_minutes: e.session_length_minutes,
            when_to_start_studying: e.when_to_start_studying,
            generation_status: e.generation_status.as_str().to_string(),
            generation_error: e.generation_error,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionResponse {
    id: Uuid,
    exam_id: Uuid,
    date: NaiveDate,
    duration_minutes: u32,
    method: String,
    topic: Option<String>,
    status: String,
}

impl From<StudySession> for StudySessionResponse {
    fn from(s: StudySession) -> Self {
        Self {
            id: s.id,
            exam_id: s.exam_id,
            date: s.date,
            duration_minutes: s.duration_minutes,
            method: s.method,
            topic: s.topic,
            status: s.status.as_str().to_string(),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the user's exams, nearest exam date first.
#[utoipa::path(
    get,
    path = "/exams",
    responses(
        (status = 200, description = "Exams of the user", body = [ExamResponse]),
        (status = 401, description = "Missing or invalid auth session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_exams_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<ExamResponse>>, HandlerError> {
    let exams = app_state
        .db
        .list_exams(user_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(exams.into_iter().map(ExamResponse::from).collect()))
}

/// Create a new exam. Its generation status starts as `NONE`.
#[utoipa::path(
    post,
    path = "/exams",
    request_body = CreateExamRequest,
    responses(
        (status = 201, description = "Exam created", body = ExamResponse),
        (status = 400, description = "Invalid exam parameters"),
        (status = 401, description = "Missing or invalid auth session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_exam_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let new_exam = NewExam::from(payload)
        .validated()
        .map_err(validation_error_response)?;

    let exam = app_state
        .db
        .create_exam(user_id, new_exam)
        .await
        .map_err(port_error_response)?;

    info!(exam_id = %exam.id, "Exam created");
    Ok((StatusCode::CREATED, Json(ExamResponse::from(exam))))
}

/// Edit an exam. The current schedule is deleted and the status reset to `NONE`.
#[utoipa::path(
    put,
    path = "/exams/{id}",
    request_body = UpdateExamRequest,
    params(("id" = Uuid, Path, description = "The exam id.")),
    responses(
        (status = 200, description = "Exam updated", body = ExamResponse),
        (status = 400, description = "Invalid exam parameters"),
        (status = 404, description = "Exam not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_exam_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(exam_id): Path<Uuid>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<Json<ExamResponse>, HandlerError> {
    let update = ExamUpdate::from(payload)
        .validated()
        .map_err(validation_error_response)?;

    let exam = app_state
        .db
        .update_exam(exam_id, user_id, update)
        .await
        .map_err(port_error_response)?;

    info!(%exam_id, "Exam updated; schedule reset");
    Ok(Json(ExamResponse::from(exam)))
}

/// Delete an exam together with its study sessions.
#[utoipa::path(
    delete,
    path = "/exams/{id}",
    params(("id" = Uuid, Path, description = "The exam id.")),
    responses(
        (status = 204, description = "Exam deleted"),
        (status = 404, description = "Exam not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_exam_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(exam_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .db
        .delete_exam(exam_id, user_id)
        .await
        .map_err(port_error_response)?;

    info!(%exam_id, "Exam deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List the persisted study sessions of an exam, ordered by date.
#[utoipa::path(
    get,
    path = "/exams/{id}/sessions",
    params(("id" = Uuid, Path, description = "The exam id.")),
    responses(
        (status = 200, description = "Sessions of the exam", body = [StudySessionResponse]),
        (status = 404, description = "Exam not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(exam_id): Path<Uuid>,
) -> Result<Json<Vec<StudySessionResponse>>, HandlerError> {
    let sessions = app_state
        .db
        .get_sessions_for_exam(exam_id, user_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(sessions.into_iter().map(StudySessionResponse::from).collect()))
}
