//! services/api/src/web/settings.rs
//!
//! Handlers for per-user study settings.

use crate::web::{
    rest::{port_error_response, validation_error_response, HandlerError},
    state::AppState,
};
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_planner_core::domain::RestDays;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// Upper-case weekday names, e.g. `["SATURDAY", "SUNDAY"]`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestDaysPayload {
    pub rest_days: Vec<String>,
}

/// Parses and checks a rest day list: known, distinct names, at most six.
pub fn parse_rest_days(names: &[String]) -> Result<RestDays, HandlerError> {
    let rest_days = RestDays::from_names(names).map_err(validation_error_response)?;
    if rest_days.len() != names.len() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Rest days must not contain duplicates".to_string(),
        ));
    }
    rest_days.validate().map_err(validation_error_response)?;
    Ok(rest_days)
}

/// The user's rest days, Monday first. Empty when never configured.
#[utoipa::path(
    get,
    path = "/settings/rest-days",
    responses(
        (status = 200, description = "Current rest days", body = RestDaysPayload),
        (status = 401, description = "Missing or invalid auth session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_rest_days_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<RestDaysPayload>, HandlerError> {
    let rest_days = app_state
        .db
        .get_rest_days(user_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(RestDaysPayload {
        rest_days: rest_days.names(),
    }))
}

/// Replace the user's rest days. Every exam of the user loses its schedule.
#[utoipa::path(
    put,
    path = "/settings/rest-days",
    request_body = RestDaysPayload,
    responses(
        (status = 200, description = "Rest days stored", body = RestDaysPayload),
        (status = 400, description = "Unknown, duplicate or too many weekday names"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_rest_days_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<RestDaysPayload>,
) -> Result<Json<RestDaysPayload>, HandlerError> {
    let rest_days = parse_rest_days(&payload.rest_days)?;

    let stored = app_state
        .db
        .update_rest_days(user_id, rest_days)
        .await
        .map_err(port_error_response)?;

    info!(%user_id, rest_days = ?stored.names(), "Rest days updated; schedules reset");
    Ok(Json(RestDaysPayload {
        rest_days: stored.names(),
    }))
}
