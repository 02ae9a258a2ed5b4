//! crates/study_planner_core/src/agenda.rs
//!
//! Builds the "today" view: the sessions planned for a date, the next exams
//! and whether the date is a rest day.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::domain::{Exam, RestDays, SessionStatus, StudySession};

/// How many upcoming exams the view lists.
pub const UPCOMING_EXAM_LIMIT: usize = 3;

/// A session planned for today, labelled with its exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaSession {
    pub id: Uuid,
    pub exam_title: String,
    pub exam_subject: Option<String>,
    pub topic: Option<String>,
    pub method: String,
    pub duration_minutes: u32,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingExam {
    pub id: Uuid,
    pub title: String,
    pub subject: Option<String>,
    pub exam_date: NaiveDate,
    /// e.g. `Today`, `Tomorrow`, `In 3 days` or `Mar 9`.
    pub relative_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayAgenda {
    pub sessions: Vec<AgendaSession>,
    pub upcoming_exams: Vec<UpcomingExam>,
    pub is_rest_day: bool,
    pub rest_days: Vec<String>,
}

/// Describes `date` relative to `today`. Dates more than a week ahead are
/// shown as `Mon D`.
pub fn relative_date(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        n @ 2..=7 => format!("In {} days", n),
        n if n < 0 => format!("{} days ago", -n),
        _ => date.format("%b %-d").to_string(),
    }
}

/// Assembles the view for `today` from the user's exams (any order), the
/// sessions stored on `today` and the user's rest days.
///
/// Sessions whose exam is not in `exams` are left out.
pub fn build_today_agenda(
    exams: &[Exam],
    sessions_today: Vec<StudySession>,
    rest_days: &RestDays,
    today: NaiveDate,
) -> TodayAgenda {
    let by_id: HashMap<Uuid, &Exam> = exams.iter().map(|e| (e.id, e)).collect();

    let sessions = sessions_today
        .into_iter()
        .filter(|s| s.date == today)
        .filter_map(|s| {
            let exam = by_id.get(&s.exam_id)?;
            Some(AgendaSession {
                id: s.id,
                exam_title: exam.title.clone(),
                exam_subject: exam.subject.clone(),
                topic: s.topic,
                method: s.method,
                duration_minutes: s.duration_minutes,
                status: s.status,
            })
        })
        .collect();

    let mut upcoming: Vec<&Exam> = exams.iter().filter(|e| e.exam_date >= today).collect();
    upcoming.sort_by_key(|e| (e.exam_date, e.created_at));
    let upcoming_exams = upcoming
        .into_iter()
        .take(UPCOMING_EXAM_LIMIT)
        .map(|e| UpcomingExam {
            id: e.id,
            title: e.title.clone(),
            subject: e.subject.clone(),
            exam_date: e.exam_date,
            relative_date: relative_date(e.exam_date, today),
        })
        .collect();

    TodayAgenda {
        sessions,
        upcoming_exams,
        is_rest_day: rest_days.contains(today.weekday()),
        rest_days: rest_days.names(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GenerationStatus;
    use chrono::{Utc, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn exam(title: &str, exam_date: NaiveDate) -> Exam {
        Exam {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: title.to_string(),
            subject: Some("Science".to_string()),
            study_methods: vec!["Flashcards".to_string()],
            preferences: None,
            exam_date,
            target_sessions_per_week: 3,
            session_length_minutes: 60,
            when_to_start_studying: "tomorrow".to_string(),
            generation_status: GenerationStatus::Generated,
            generation_error: None,
            created_at: Utc::now(),
        }
    }

    fn session(exam: &Exam, on: NaiveDate) -> StudySession {
        StudySession {
            id: Uuid::new_v4(),
            exam_id: exam.id,
            user_id: exam.user_id,
            date: on,
            duration_minutes: 45,
            method: "Flashcards".to_string(),
            topic: Some(format!("Prep for {} — Flashcards", exam.title)),
            status: SessionStatus::Planned,
        }
    }

    #[test]
    fn relative_dates() {
        let today = date(2026, 2, 9);
        assert_eq!(relative_date(today, today), "Today");
        assert_eq!(relative_date(date(2026, 2, 10), today), "Tomorrow");
        assert_eq!(relative_date(date(2026, 2, 14), today), "In 5 days");
        assert_eq!(relative_date(date(2026, 2, 16), today), "In 7 days");
        assert_eq!(relative_date(date(2026, 3, 9), today), "Mar 9");
        assert_eq!(relative_date(date(2026, 2, 6), today), "3 days ago");
    }

    #[test]
    fn lists_three_nearest_future_exams() {
        let today = date(2026, 2, 9);
        let exams = vec![
            exam("Late", date(2026, 5, 1)),
            exam("Past", date(2026, 2, 1)),
            exam("Soon", date(2026, 2, 10)),
            exam("Today", today),
            exam("Mid", date(2026, 3, 9)),
        ];

        let agenda = build_today_agenda(&exams, Vec::new(), &RestDays::default(), today);

        let titles: Vec<&str> = agenda.upcoming_exams.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Today", "Soon", "Mid"]);
        assert_eq!(agenda.upcoming_exams[0].relative_date, "Today");
        assert_eq!(agenda.upcoming_exams[1].relative_date, "Tomorrow");
    }

    #[test]
    fn labels_todays_sessions_with_their_exam() {
        let today = date(2026, 2, 9);
        let stats = exam("Statistics", date(2026, 3, 9));
        let orphan = exam("Deleted", date(2026, 3, 9));
        let sessions = vec![session(&stats, today), session(&orphan, today)];

        let agenda = build_today_agenda(
            std::slice::from_ref(&stats),
            sessions,
            &RestDays::default(),
            today,
        );

        assert_eq!(agenda.sessions.len(), 1);
        let s = &agenda.sessions[0];
        assert_eq!(s.exam_title, "Statistics");
        assert_eq!(s.exam_subject.as_deref(), Some("Science"));
        assert_eq!(s.duration_minutes, 45);
        assert_eq!(s.status, SessionStatus::Planned);
    }

    #[test]
    fn reports_rest_day() {
        let monday = date(2026, 2, 9);
        let rest = RestDays::new([Weekday::Sun, Weekday::Mon]);

        let agenda = build_today_agenda(&[], Vec::new(), &rest, monday);
        assert!(agenda.is_rest_day);
        assert_eq!(agenda.rest_days, vec!["MONDAY".to_string(), "SUNDAY".to_string()]);

        let tuesday = build_today_agenda(&[], Vec::new(), &rest, date(2026, 2, 10));
        assert!(!tuesday.is_rest_day);
    }
}
