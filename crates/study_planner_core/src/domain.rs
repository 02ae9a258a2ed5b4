//! crates/study_planner_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP representation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ScheduleError;

/// Session lengths (in minutes) an exam may be configured with.
pub const ALLOWED_SESSION_LENGTHS: [u32; 5] = [30, 45, 60, 90, 120];

/// Upper bound for `target_sessions_per_week`: three sessions on every day.
pub const MAX_SESSIONS_PER_WEEK: u32 = 21;

//=========================================================================================
// Timing Preferences
//=========================================================================================

/// When the user wants to start studying for an exam.
///
/// The first four values are relative to the day the schedule is generated,
/// the last four are offsets backwards from the exam date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhenToStart {
    Tomorrow,
    InTwoDays,
    InThreeDays,
    NextWeek,
    TheWeekBefore,
    TwoWeeksBefore,
    ThreeWeeksBefore,
    FourWeeksBefore,
}

impl WhenToStart {
    pub const ALL: [WhenToStart; 8] = [
        WhenToStart::Tomorrow,
        WhenToStart::InTwoDays,
        WhenToStart::InThreeDays,
        WhenToStart::NextWeek,
        WhenToStart::TheWeekBefore,
        WhenToStart::TwoWeeksBefore,
        WhenToStart::ThreeWeeksBefore,
        WhenToStart::FourWeeksBefore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WhenToStart::Tomorrow => "tomorrow",
            WhenToStart::InTwoDays => "in_2_days",
            WhenToStart::InThreeDays => "in_3_days",
            WhenToStart::NextWeek => "next_week",
            WhenToStart::TheWeekBefore => "the_week_before",
            WhenToStart::TwoWeeksBefore => "2_weeks_before",
            WhenToStart::ThreeWeeksBefore => "3_weeks_before",
            WhenToStart::FourWeeksBefore => "4_weeks_before",
        }
    }
}

impl FromStr for WhenToStart {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WhenToStart::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| {
                ScheduleError::InvalidParameter(format!("Invalid whenToStartStudying value: {}", s))
            })
    }
}

impl fmt::Display for WhenToStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Statuses
//=========================================================================================

/// The lifecycle of schedule generation for one exam.
///
/// `None -> Generating -> {Generated | Failed}`; edits reset back to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    None,
    Generating,
    Generated,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::None => "NONE",
            GenerationStatus::Generating => "GENERATING",
            GenerationStatus::Generated => "GENERATED",
            GenerationStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for GenerationStatus {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(GenerationStatus::None),
            "GENERATING" => Ok(GenerationStatus::Generating),
            "GENERATED" => Ok(GenerationStatus::Generated),
            "FAILED" => Ok(GenerationStatus::Failed),
            other => Err(ScheduleError::InvalidParameter(format!(
                "Unknown generation status: {}",
                other
            ))),
        }
    }
}

/// Generation only ever writes planned sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Planned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Planned => "PLANNED",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLANNED" => Ok(SessionStatus::Planned),
            other => Err(ScheduleError::InvalidParameter(format!(
                "Unknown session status: {}",
                other
            ))),
        }
    }
}

//=========================================================================================
// Rest Days
//=========================================================================================

/// Upper-case English weekday name, e.g. `MONDAY`.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

pub fn parse_weekday_name(name: &str) -> Result<Weekday, ScheduleError> {
    match name {
        "MONDAY" => Ok(Weekday::Mon),
        "TUESDAY" => Ok(Weekday::Tue),
        "WEDNESDAY" => Ok(Weekday::Wed),
        "THURSDAY" => Ok(Weekday::Thu),
        "FRIDAY" => Ok(Weekday::Fri),
        "SATURDAY" => Ok(Weekday::Sat),
        "SUNDAY" => Ok(Weekday::Sun),
        other => Err(ScheduleError::InvalidParameter(format!(
            "Unknown weekday name: {}",
            other
        ))),
    }
}

/// The weekdays a user never studies on.
///
/// Stored deduplicated and ordered Monday first. A stored configuration has at
/// most six entries; the deriver still guards against all seven.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestDays {
    days: Vec<Weekday>,
}

impl RestDays {
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut days: Vec<Weekday> = days.into_iter().collect();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        Self { days }
    }

    /// Parses persisted or user-supplied weekday names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ScheduleError> {
        let days = names
            .iter()
            .map(|n| parse_weekday_name(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(days))
    }

    /// Rejects configurations that would leave no study day in a week.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.days.len() >= 7 {
            return Err(ScheduleError::InvalidParameter(
                "Cannot mark all 7 days as rest days".to_string(),
            ));
        }
        Ok(())
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.days.iter().map(|d| weekday_name(*d).to_string()).collect()
    }
}

//=========================================================================================
// Exams
//=========================================================================================

/// An exam owned by a user, with the timing preferences used to plan for it.
#[derive(Debug, Clone)]
pub struct Exam {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub subject: Option<String>,
    pub study_methods: Vec<String>,
    /// Free-text hint for the placement capability. Never parsed by the core.
    pub preferences: Option<String>,
    pub exam_date: NaiveDate,
    pub target_sessions_per_week: u32,
    pub session_length_minutes: u32,
    /// Raw persisted value; parsed into [`WhenToStart`] during derivation.
    pub when_to_start_studying: String,
    pub generation_status: GenerationStatus,
    pub generation_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new exam.
#[derive(Debug, Clone)]
pub struct NewExam {
    pub title: String,
    pub subject: Option<String>,
    pub study_methods: Vec<String>,
    pub preferences: Option<String>,
    pub exam_date: NaiveDate,
    pub target_sessions_per_week: u32,
    pub session_length_minutes: u32,
    pub when_to_start_studying: String,
}

impl NewExam {
    /// Checks every field and returns the trimmed, normalized exam.
    pub fn validated(mut self) -> Result<Self, ScheduleError> {
        self.title = validate_title(&self.title)?;
        validate_study_methods(&self.study_methods)?;
        validate_target(self.target_sessions_per_week)?;
        validate_session_length(self.session_length_minutes)?;
        self.when_to_start_studying.parse::<WhenToStart>()?;
        self.subject = normalize_optional(self.subject);
        self.preferences = normalize_optional(self.preferences);
        Ok(self)
    }
}

/// A partial edit of an existing exam. `None` leaves the field unchanged.
///
/// For `subject` and `preferences` an empty string clears the value.
#[derive(Debug, Clone, Default)]
pub struct ExamUpdate {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub study_methods: Option<Vec<String>>,
    pub preferences: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub target_sessions_per_week: Option<u32>,
    pub session_length_minutes: Option<u32>,
    pub when_to_start_studying: Option<String>,
}

impl ExamUpdate {
    pub fn validated(mut self) -> Result<Self, ScheduleError> {
        if let Some(title) = &self.title {
            self.title = Some(validate_title(title)?);
        }
        if let Some(methods) = &self.study_methods {
            validate_study_methods(methods)?;
        }
        if let Some(target) = self.target_sessions_per_week {
            validate_target(target)?;
        }
        if let Some(length) = self.session_length_minutes {
            validate_session_length(length)?;
        }
        if let Some(when) = &self.when_to_start_studying {
            when.parse::<WhenToStart>()?;
        }
        self.subject = self.subject.map(|s| s.trim().to_string());
        self.preferences = self.preferences.map(|p| p.trim().to_string());
        Ok(self)
    }

    /// Applies the edit to an in-memory exam.
    pub fn apply_to(&self, exam: &mut Exam) {
        if let Some(title) = &self.title {
            exam.title = title.clone();
        }
        if let Some(subject) = &self.subject {
            exam.subject = normalize_optional(Some(subject.clone()));
        }
        if let Some(methods) = &self.study_methods {
            exam.study_methods = methods.clone();
        }
        if let Some(preferences) = &self.preferences {
            exam.preferences = normalize_optional(Some(preferences.clone()));
        }
        if let Some(date) = self.exam_date {
            exam.exam_date = date;
        }
        if let Some(target) = self.target_sessions_per_week {
            exam.target_sessions_per_week = target;
        }
        if let Some(length) = self.session_length_minutes {
            exam.session_length_minutes = length;
        }
        if let Some(when) = &self.when_to_start_studying {
            exam.when_to_start_studying = when.clone();
        }
    }
}

fn validate_title(title: &str) -> Result<String, ScheduleError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ScheduleError::InvalidParameter("Title is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_study_methods(methods: &[String]) -> Result<(), ScheduleError> {
    if methods.is_empty() || methods.iter().any(|m| m.trim().is_empty()) {
        return Err(ScheduleError::InvalidParameter(
            "At least one non-empty study method is required".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_target(target: u32) -> Result<(), ScheduleError> {
    if target < 1 {
        return Err(ScheduleError::InvalidParameter(
            "targetSessionsPerWeek must be at least 1".to_string(),
        ));
    }
    if target > MAX_SESSIONS_PER_WEEK {
        return Err(ScheduleError::InvalidParameter(format!(
            "targetSessionsPerWeek must be at most {}",
            MAX_SESSIONS_PER_WEEK
        )));
    }
    Ok(())
}

fn validate_session_length(minutes: u32) -> Result<(), ScheduleError> {
    if !ALLOWED_SESSION_LENGTHS.contains(&minutes) {
        return Err(ScheduleError::InvalidParameter(
            "Invalid session length. Must be one of: 30, 45, 60, 90, or 120 minutes".to_string(),
        ));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//=========================================================================================
// Study Sessions
//=========================================================================================

/// A persisted study session.
#[derive(Debug, Clone)]
pub struct StudySession {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub method: String,
    pub topic: Option<String>,
    pub status: SessionStatus,
}

/// A session about to be persisted as part of a replacement set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudySession {
    pub exam_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub method: String,
    pub topic: String,
    pub status: SessionStatus,
}

impl NewStudySession {
    pub fn from_proposal(exam: &Exam, proposal: &ProposedSession) -> Self {
        Self {
            exam_id: exam.id,
            user_id: exam.user_id,
            date: proposal.date,
            duration_minutes: proposal.duration_minutes,
            method: proposal.method.clone(),
            topic: topic_label(&exam.title, &proposal.method),
            status: SessionStatus::Planned,
        }
    }
}

/// The label stored as a session's topic.
pub fn topic_label(exam_title: &str, method: &str) -> String {
    format!("Prep for {} — {}", exam_title, method)
}

/// One placed session, either proposed by the placement capability or
/// produced by the deterministic generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedSession {
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_exam() -> NewExam {
        NewExam {
            title: "  Linear Algebra ".to_string(),
            subject: Some("  ".to_string()),
            study_methods: vec!["Flashcards".to_string(), "Practice problems".to_string()],
            preferences: Some(" mornings ".to_string()),
            exam_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            target_sessions_per_week: 3,
            session_length_minutes: 60,
            when_to_start_studying: "tomorrow".to_string(),
        }
    }

    #[test]
    fn when_to_start_round_trips_every_value() {
        for when in WhenToStart::ALL {
            assert_eq!(when.as_str().parse::<WhenToStart>().unwrap(), when);
        }
    }

    #[test]
    fn unknown_when_to_start_is_invalid_parameter() {
        let err = "5_weeks_before".parse::<WhenToStart>().unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidParameter(_)));
    }

    #[test]
    fn rest_days_are_deduplicated_and_ordered() {
        let rest = RestDays::from_names(&["SUNDAY", "MONDAY", "SUNDAY"]).unwrap();
        assert_eq!(rest.names(), vec!["MONDAY", "SUNDAY"]);
        assert!(rest.contains(Weekday::Sun));
        assert!(!rest.contains(Weekday::Sat));
    }

    #[test]
    fn rest_days_reject_unknown_names_and_full_weeks() {
        assert!(RestDays::from_names(&["Funday"]).is_err());

        let all = RestDays::new([
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]);
        assert!(all.validate().is_err());
        assert!(RestDays::default().validate().is_ok());
    }

    #[test]
    fn new_exam_is_trimmed_and_normalized() {
        let exam = new_exam().validated().unwrap();
        assert_eq!(exam.title, "Linear Algebra");
        assert_eq!(exam.subject, None);
        assert_eq!(exam.preferences.as_deref(), Some("mornings"));
    }

    #[test]
    fn new_exam_rejects_bad_fields() {
        let mut exam = new_exam();
        exam.session_length_minutes = 50;
        assert!(exam.validated().is_err());

        let mut exam = new_exam();
        exam.target_sessions_per_week = 0;
        assert!(exam.validated().is_err());

        let mut exam = new_exam();
        exam.study_methods.clear();
        assert!(exam.validated().is_err());

        let mut exam = new_exam();
        exam.title = "   ".to_string();
        assert!(exam.validated().is_err());
    }

    #[test]
    fn target_above_daily_maximum_is_rejected() {
        let mut exam = new_exam();
        exam.target_sessions_per_week = MAX_SESSIONS_PER_WEEK;
        assert!(exam.validated().is_ok());

        for target in [MAX_SESSIONS_PER_WEEK + 1, 10_000_000, 700_000_000, u32::MAX] {
            let mut exam = new_exam();
            exam.target_sessions_per_week = target;
            assert!(matches!(exam.validated(), Err(ScheduleError::InvalidParameter(_))));
        }

        let update = ExamUpdate {
            target_sessions_per_week: Some(700_000_000),
            ..ExamUpdate::default()
        };
        assert!(update.validated().is_err());
    }

    #[test]
    fn topic_label_names_exam_and_method() {
        assert_eq!(topic_label("Biology", "Flashcards"), "Prep for Biology — Flashcards");
    }

    #[test]
    fn only_planned_session_status_is_stored() {
        assert_eq!("PLANNED".parse::<SessionStatus>().unwrap(), SessionStatus::Planned);
        assert!("COMPLETED".parse::<SessionStatus>().is_err());
        assert!("SKIPPED".parse::<SessionStatus>().is_err());
    }
}
