//! crates/study_planner_core/src/deriver.rs
//!
//! Turns an exam's timing preferences into a concrete study window, the list of
//! eligible dates, and an exact per-week session quota.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::domain::{validate_target, Exam, RestDays, StudySession, WhenToStart};
use crate::error::ScheduleError;

//=========================================================================================
// Week Buckets
//=========================================================================================

/// Position of a calendar week within the study window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekKind {
    /// Partial week containing the start date.
    First,
    /// A whole week between the first and the exam week.
    Full,
    /// Partial week containing the last study day.
    Exam,
    /// Start and last study day share one calendar week.
    Only,
}

/// A Monday–Sunday segment of the study window with its own exact quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekBucket {
    pub week_index: usize,
    #[serde(rename = "type")]
    pub kind: WeekKind,
    pub week_start: NaiveDate,
    /// Eligible dates of this week, in chronological order. Never empty.
    pub study_days: Vec<NaiveDate>,
    pub session_count: u32,
}

impl WeekBucket {
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.study_days.first().copied()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.study_days.last().copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.study_days.binary_search(&date).is_ok()
    }
}

//=========================================================================================
// Derived Inputs
//=========================================================================================

/// Everything the placement step needs, computed once per generation.
#[derive(Debug, Clone)]
pub struct ScheduleInputs {
    pub start_date: NaiveDate,
    pub exam_date: NaiveDate,
    pub days_to_exam: i64,
    /// Eligible dates in `[start_date, exam_date)`, chronological, never empty.
    pub available_dates: Vec<NaiveDate>,
    pub week_breakdown: Vec<WeekBucket>,
    pub total_sessions_needed: u32,
    pub target_sessions_per_week: u32,
    pub session_length_minutes: u32,
    pub rest_days: RestDays,
    /// Minutes already planned for other exams, informational only.
    pub existing_minutes_by_date: BTreeMap<NaiveDate, u32>,
}

impl ScheduleInputs {
    pub fn first_study_day(&self) -> Option<NaiveDate> {
        self.available_dates.first().copied()
    }

    pub fn last_study_day(&self) -> Option<NaiveDate> {
        self.available_dates.last().copied()
    }
}

//=========================================================================================
// Start Date
//=========================================================================================

impl WhenToStart {
    /// The start date before clamping to tomorrow.
    pub fn unclamped_start(self, exam_date: NaiveDate, today: NaiveDate) -> NaiveDate {
        match self {
            WhenToStart::Tomorrow => today + Duration::days(1),
            WhenToStart::InTwoDays => today + Duration::days(2),
            WhenToStart::InThreeDays => today + Duration::days(3),
            WhenToStart::NextWeek => next_monday(today),
            WhenToStart::TheWeekBefore => exam_date - Duration::days(7),
            WhenToStart::TwoWeeksBefore => exam_date - Duration::days(14),
            WhenToStart::ThreeWeeksBefore => exam_date - Duration::days(21),
            WhenToStart::FourWeeksBefore => exam_date - Duration::days(28),
        }
    }
}

/// Computes the first day of the study window.
///
/// Never earlier than tomorrow: sessions are not scheduled in the past.
pub fn compute_start_date(
    when_to_start: &str,
    exam_date: NaiveDate,
    today: NaiveDate,
) -> Result<NaiveDate, ScheduleError> {
    let when: WhenToStart = when_to_start.parse()?;
    let tomorrow = today + Duration::days(1);
    Ok(when.unclamped_start(exam_date, today).max(tomorrow))
}

/// The Monday strictly after `date`.
fn next_monday(date: NaiveDate) -> NaiveDate {
    let from_monday = i64::from(date.weekday().num_days_from_monday());
    date + Duration::days(7 - from_monday)
}

/// The Monday of the calendar week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

//=========================================================================================
// Derivation
//=========================================================================================

/// Derives the study window, eligible dates and week breakdown for an exam.
pub fn derive_schedule_inputs(
    exam: &Exam,
    rest_days: &RestDays,
    other_sessions: &[StudySession],
    today: NaiveDate,
) -> Result<ScheduleInputs, ScheduleError> {
    if rest_days.len() >= 7 {
        return Err(ScheduleError::NoEligibleDays);
    }
    validate_target(exam.target_sessions_per_week)?;
    if exam.session_length_minutes == 0 {
        return Err(ScheduleError::InvalidParameter(
            "sessionLengthMinutes must be positive".to_string(),
        ));
    }
    if exam.study_methods.is_empty() {
        return Err(ScheduleError::InvalidParameter(
            "At least one study method is required".to_string(),
        ));
    }

    let start_date = compute_start_date(&exam.when_to_start_studying, exam.exam_date, today)?;

    let days_to_exam = (exam.exam_date - start_date).num_days();
    if days_to_exam <= 0 {
        return Err(ScheduleError::InfeasibleWindow {
            start: start_date,
            exam: exam.exam_date,
        });
    }

    let available_dates: Vec<NaiveDate> = start_date
        .iter_days()
        .take_while(|d| *d < exam.exam_date)
        .filter(|d| !rest_days.contains(d.weekday()))
        .collect();
    if available_dates.is_empty() {
        return Err(ScheduleError::NoEligibleDays);
    }

    let study_days_per_week = 7 - rest_days.len() as u32;
    let week_breakdown = build_week_breakdown(
        &available_dates,
        start_date,
        exam.exam_date - Duration::days(1),
        exam.target_sessions_per_week,
        study_days_per_week,
    )?;
    let total_sessions_needed = week_breakdown
        .iter()
        .try_fold(0u32, |acc, b| acc.checked_add(b.session_count))
        .ok_or_else(too_many_sessions)?
        .max(1);

    Ok(ScheduleInputs {
        start_date,
        exam_date: exam.exam_date,
        days_to_exam,
        available_dates,
        week_breakdown,
        total_sessions_needed,
        target_sessions_per_week: exam.target_sessions_per_week,
        session_length_minutes: exam.session_length_minutes,
        rest_days: rest_days.clone(),
        existing_minutes_by_date: minutes_by_date(other_sessions),
    })
}

/// Splits `[start_date, last_study_day]` into Monday–Sunday buckets.
///
/// Partial weeks are prorated by `target / study_days_per_week`: floored at the
/// start, ceiled at the exam end, and never below one session. Whole weeks get
/// exactly `target`. Weeks without an eligible day are omitted.
///
/// A bucket holding the global first or last study day never gets fewer
/// sessions than the number of those pinned days it contains.
fn build_week_breakdown(
    available_dates: &[NaiveDate],
    start_date: NaiveDate,
    last_study_day: NaiveDate,
    target: u32,
    study_days_per_week: u32,
) -> Result<Vec<WeekBucket>, ScheduleError> {
    let (Some(&first_day), Some(&last_day)) = (available_dates.first(), available_dates.last())
    else {
        return Ok(Vec::new());
    };
    let first_monday = week_start(start_date);
    let last_monday = week_start(last_study_day);

    let per_week = u64::from(study_days_per_week);
    let to_quota = |quota: u64| u32::try_from(quota).map_err(|_| too_many_sessions());
    let floor_share = |days: u32| to_quota(u64::from(days) * u64::from(target) / per_week);
    let ceil_share = |days: u32| to_quota((u64::from(days) * u64::from(target)).div_ceil(per_week));

    let mut buckets = Vec::new();
    let mut monday = first_monday;
    while monday <= last_monday {
        let sunday = monday + Duration::days(6);
        let study_days: Vec<NaiveDate> = available_dates
            .iter()
            .copied()
            .filter(|d| *d >= monday && *d <= sunday)
            .collect();

        if !study_days.is_empty() {
            let days = study_days.len() as u32;
            let pinned = u32::from(study_days.contains(&first_day))
                + u32::from(last_day != first_day && study_days.contains(&last_day));

            let (kind, share) = if first_monday == last_monday {
                (WeekKind::Only, ceil_share(days)?.max(1))
            } else if monday == first_monday {
                (WeekKind::First, floor_share(days)?.max(1))
            } else if monday == last_monday {
                (WeekKind::Exam, ceil_share(days)?.max(1))
            } else {
                (WeekKind::Full, target)
            };

            buckets.push(WeekBucket {
                week_index: buckets.len(),
                kind,
                week_start: monday,
                study_days,
                session_count: share.max(pinned),
            });
        }

        monday += Duration::days(7);
    }

    Ok(buckets)
}

fn too_many_sessions() -> ScheduleError {
    ScheduleError::InvalidParameter("Study window needs more sessions than can be planned".to_string())
}

/// Sums session minutes per date.
pub fn minutes_by_date(sessions: &[StudySession]) -> BTreeMap<NaiveDate, u32> {
    let mut totals = BTreeMap::new();
    for session in sessions {
        *totals.entry(session.date).or_insert(0) += session.duration_minutes;
    }
    totals
}
