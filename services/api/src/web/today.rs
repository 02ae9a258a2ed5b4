//! services/api/src/web/today.rs
//!
//! The "today" view: sessions planned for today, the next exams and the
//! user's rest days in one payload.

use crate::web::{
    rest::{port_error_response, HandlerError},
    state::AppState,
};
use axum::{extract::State, response::Json, Extension};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use study_planner_core::agenda::{build_today_agenda, AgendaSession, TodayAgenda, UpcomingExam};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodaySessionResponse {
    id: Uuid,
    exam_title: String,
    exam_subject: Option<String>,
    topic: Option<String>,
    method: String,
    /// Minutes.
    duration: u32,
    status: String,
}

impl From<AgendaSession> for TodaySessionResponse {
    fn from(s: AgendaSession) -> Self {
        Self {
            id: s.id,
            exam_title: s.exam_title,
            exam_subject: s.exam_subject,
            topic: s.topic,
            method: s.method,
            duration: s.duration_minutes,
            status: s.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingExamResponse {
    id: Uuid,
    title: String,
    subject: Option<String>,
    date: NaiveDate,
    relative_date: String,
}

impl From<UpcomingExam> for UpcomingExamResponse {
    fn from(e: UpcomingExam) -> Self {
        Self {
            id: e.id,
            title: e.title,
            subject: e.subject,
            date: e.exam_date,
            relative_date: e.relative_date,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayResponse {
    sessions: Vec<TodaySessionResponse>,
    /// At most three, nearest first.
    upcoming_exams: Vec<UpcomingExamResponse>,
    is_rest_day: bool,
    rest_days: Vec<String>,
}

impl From<TodayAgenda> for TodayResponse {
    fn from(a: TodayAgenda) -> Self {
        Self {
            sessions: a.sessions.into_iter().map(TodaySessionResponse::from).collect(),
            upcoming_exams: a
                .upcoming_exams
                .into_iter()
                .map(UpcomingExamResponse::from)
                .collect(),
            is_rest_day: a.is_rest_day,
            rest_days: a.rest_days,
        }
    }
}

/// Today's sessions, the three nearest upcoming exams and the rest-day status.
#[utoipa::path(
    get,
    path = "/today",
    responses(
        (status = 200, description = "Today's agenda", body = TodayResponse),
        (status = 401, description = "Missing or invalid auth session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn today_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<TodayResponse>, HandlerError> {
    let today = Utc::now().date_naive();

    let exams = app_state
        .db
        .list_exams(user_id)
        .await
        .map_err(port_error_response)?;
    let sessions = app_state
        .db
        .get_sessions_on(user_id, today)
        .await
        .map_err(port_error_response)?;
    let rest_days = app_state
        .db
        .get_rest_days(user_id)
        .await
        .map_err(port_error_response)?;

    let agenda = build_today_agenda(&exams, sessions, &rest_days, today);
    Ok(Json(TodayResponse::from(agenda)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_planner_core::SessionStatus;

    #[test]
    fn today_payload_uses_camel_case_field_names() {
        let agenda = TodayAgenda {
            sessions: vec![AgendaSession {
                id: Uuid::nil(),
                exam_title: "Statistics".to_string(),
                exam_subject: None,
                topic: Some("Prep for Statistics — Flashcards".to_string()),
                method: "Flashcards".to_string(),
                duration_minutes: 60,
                status: SessionStatus::Planned,
            }],
            upcoming_exams: vec![UpcomingExam {
                id: Uuid::nil(),
                title: "Statistics".to_string(),
                subject: None,
                exam_date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
                relative_date: "Tomorrow".to_string(),
            }],
            is_rest_day: false,
            rest_days: vec!["SATURDAY".to_string()],
        };

        let json = serde_json::to_value(TodayResponse::from(agenda)).unwrap();
        assert_eq!(json["sessions"][0]["examTitle"], "Statistics");
        assert_eq!(json["sessions"][0]["duration"], 60);
        assert_eq!(json["sessions"][0]["status"], "PLANNED");
        assert_eq!(json["upcomingExams"][0]["relativeDate"], "Tomorrow");
        assert_eq!(json["upcomingExams"][0]["date"], "2026-02-10");
        assert_eq!(json["isRestDay"], false);
        assert_eq!(json["restDays"][0], "SATURDAY");
    }
}
