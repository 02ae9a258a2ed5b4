//! Common test utilities: in-memory implementations of the core ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc, Weekday};
use study_planner_core::domain::{
    Exam, ExamUpdate, GenerationStatus, NewExam, NewStudySession, ProposedSession, RestDays,
    StudySession,
};
use study_planner_core::placement::PlacementRequest;
use study_planner_core::ports::{DatabaseService, PlacementService, PortError, PortResult};
use uuid::Uuid;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monday 2026-02-09, the "today" of the reference scenario.
pub fn today() -> NaiveDate {
    date(2026, 2, 9)
}

pub fn methods() -> Vec<String> {
    vec!["Flashcards".to_string(), "Practice exam".to_string()]
}

/// Exam on Monday 2026-03-09, starting tomorrow, three 60-minute sessions a week.
pub fn reference_exam() -> NewExam {
    NewExam {
        title: "Statistics".to_string(),
        subject: Some("Math".to_string()),
        study_methods: methods(),
        preferences: None,
        exam_date: date(2026, 3, 9),
        target_sessions_per_week: 3,
        session_length_minutes: 60,
        when_to_start_studying: "tomorrow".to_string(),
    }
}

//=========================================================================================
// In-memory DatabaseService
//=========================================================================================

#[derive(Default)]
struct State {
    exams: HashMap<Uuid, Exam>,
    sessions: Vec<StudySession>,
    rest_days: HashMap<Uuid, RestDays>,
    transitions: Vec<(Uuid, GenerationStatus, GenerationStatus)>,
    generation_ids: HashMap<Uuid, Uuid>,
    edit_before_claim: Option<(Uuid, ExamUpdate)>,
    fail_commit: bool,
}

#[derive(Default)]
pub struct InMemoryDb {
    state: Mutex<State>,
}

impl InMemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_rest_days(&self, user_id: Uuid, days: impl IntoIterator<Item = Weekday>) {
        self.state
            .lock()
            .unwrap()
            .rest_days
            .insert(user_id, RestDays::new(days));
    }

    pub fn fail_next_commit(&self) {
        self.state.lock().unwrap().fail_commit = true;
    }

    /// Applies `update` (and its reset) inside the next `claim_generation`,
    /// just before the status guard runs.
    pub fn edit_before_next_claim(&self, exam_id: Uuid, update: ExamUpdate) {
        self.state.lock().unwrap().edit_before_claim = Some((exam_id, update));
    }

    pub fn exam(&self, exam_id: Uuid) -> Exam {
        self.state.lock().unwrap().exams[&exam_id].clone()
    }

    pub fn status(&self, exam_id: Uuid) -> GenerationStatus {
        self.exam(exam_id).generation_status
    }

    pub fn sessions_of(&self, exam_id: Uuid) -> Vec<StudySession> {
        let mut sessions: Vec<StudySession> = self
            .state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .filter(|s| s.exam_id == exam_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.date);
        sessions
    }

    /// Every successful status transition, in order.
    pub fn transitions_of(&self, exam_id: Uuid) -> Vec<(GenerationStatus, GenerationStatus)> {
        self.state
            .lock()
            .unwrap()
            .transitions
            .iter()
            .filter(|(id, _, _)| *id == exam_id)
            .map(|(_, from, to)| (*from, *to))
            .collect()
    }

    fn owns_run(state: &State, exam_id: Uuid, generation_id: Uuid) -> bool {
        state.generation_ids.get(&exam_id) == Some(&generation_id)
            && state.exams.get(&exam_id).map(|e| e.generation_status) == Some(GenerationStatus::Generating)
    }

    fn owned_exam<'a>(state: &'a mut State, exam_id: Uuid, user_id: Uuid) -> PortResult<&'a mut Exam> {
        let exam = state
            .exams
            .get_mut(&exam_id)
            .ok_or_else(|| PortError::NotFound(format!("Exam {} not found", exam_id)))?;
        if exam.user_id != user_id {
            return Err(PortError::Unauthorized);
        }
        Ok(exam)
    }

    fn reset(state: &mut State, exam_id: Uuid) {
        state.sessions.retain(|s| s.exam_id != exam_id);
        state.generation_ids.remove(&exam_id);
        if let Some(exam) = state.exams.get_mut(&exam_id) {
            exam.generation_status = GenerationStatus::None;
            exam.generation_error = None;
        }
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn validate_auth_session(&self, _session_id: &str) -> PortResult<Uuid> {
        Err(PortError::Unauthorized)
    }

    async fn get_exam_for_user(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<Exam> {
        let mut state = self.state.lock().unwrap();
        Self::owned_exam(&mut state, exam_id, user_id).map(|e| e.clone())
    }

    async fn list_exams(&self, user_id: Uuid) -> PortResult<Vec<Exam>> {
        let mut exams: Vec<Exam> = self
            .state
            .lock()
            .unwrap()
            .exams
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        exams.sort_by_key(|e| e.exam_date);
        Ok(exams)
    }

    async fn create_exam(&self, user_id: Uuid, exam: NewExam) -> PortResult<Exam> {
        let exam = Exam {
            id: Uuid::new_v4(),
            user_id,
            title: exam.title,
            subject: exam.subject,
            study_methods: exam.study_methods,
            preferences: exam.preferences,
            exam_date: exam.exam_date,
            target_sessions_per_week: exam.target_sessions_per_week,
            session_length_minutes: exam.session_length_minutes,
            when_to_start_studying: exam.when_to_start_studying,
            generation_status: GenerationStatus::None,
            generation_error: None,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().exams.insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn update_exam(&self, exam_id: Uuid, user_id: Uuid, update: ExamUpdate) -> PortResult<Exam> {
        let mut state = self.state.lock().unwrap();
        update.apply_to(Self::owned_exam(&mut state, exam_id, user_id)?);
        Self::reset(&mut state, exam_id);
        Ok(state.exams[&exam_id].clone())
    }

    async fn delete_exam(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::owned_exam(&mut state, exam_id, user_id)?;
        Self::reset(&mut state, exam_id);
        state.exams.remove(&exam_id);
        Ok(())
    }

    async fn reset_schedule(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::owned_exam(&mut state, exam_id, user_id)?;
        Self::reset(&mut state, exam_id);
        Ok(())
    }

    async fn get_rest_days(&self, user_id: Uuid) -> PortResult<RestDays> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .rest_days
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_rest_days(&self, user_id: Uuid, rest_days: RestDays) -> PortResult<RestDays> {
        let mut state = self.state.lock().unwrap();
        state.rest_days.insert(user_id, rest_days.clone());
        let owned: Vec<Uuid> = state
            .exams
            .values()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.id)
            .collect();
        for exam_id in owned {
            Self::reset(&mut state, exam_id);
        }
        Ok(rest_days)
    }

    async fn claim_generation(&self, exam_id: Uuid) -> PortResult<Option<Uuid>> {
        let mut state = self.state.lock().unwrap();
        if let Some((edited, update)) = state.edit_before_claim.take() {
            if let Some(exam) = state.exams.get_mut(&edited) {
                update.apply_to(exam);
            }
            Self::reset(&mut state, edited);
        }
        let exam = state
            .exams
            .get_mut(&exam_id)
            .ok_or_else(|| PortError::NotFound(format!("Exam {} not found", exam_id)))?;
        if exam.generation_status != GenerationStatus::None {
            return Ok(None);
        }
        exam.generation_status = GenerationStatus::Generating;
        exam.generation_error = None;
        let generation_id = Uuid::new_v4();
        state.generation_ids.insert(exam_id, generation_id);
        state
            .transitions
            .push((exam_id, GenerationStatus::None, GenerationStatus::Generating));
        Ok(Some(generation_id))
    }

    async fn record_failure(&self, exam_id: Uuid, reason: &str) -> PortResult<bool> {
        let mut state = self.state.lock().unwrap();
        let exam = state
            .exams
            .get_mut(&exam_id)
            .ok_or_else(|| PortError::NotFound(format!("Exam {} not found", exam_id)))?;
        if exam.generation_status != GenerationStatus::None {
            return Ok(false);
        }
        exam.generation_status = GenerationStatus::Failed;
        exam.generation_error = Some(reason.to_string());
        state
            .transitions
            .push((exam_id, GenerationStatus::None, GenerationStatus::Failed));
        Ok(true)
    }

    async fn fail_generation(&self, exam_id: Uuid, generation_id: Uuid, reason: &str) -> PortResult<bool> {
        let mut state = self.state.lock().unwrap();
        if !Self::owns_run(&state, exam_id, generation_id) {
            return Ok(false);
        }
        state.generation_ids.remove(&exam_id);
        if let Some(exam) = state.exams.get_mut(&exam_id) {
            exam.generation_status = GenerationStatus::Failed;
            exam.generation_error = Some(reason.to_string());
        }
        state
            .transitions
            .push((exam_id, GenerationStatus::Generating, GenerationStatus::Failed));
        Ok(true)
    }

    async fn commit_schedule(
        &self,
        exam_id: Uuid,
        generation_id: Uuid,
        sessions: Vec<NewStudySession>,
    ) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_commit) {
            return Err(PortError::Unexpected("connection reset by peer".to_string()));
        }
        if !state.exams.contains_key(&exam_id) {
            return Err(PortError::NotFound(format!("Exam {} not found", exam_id)));
        }
        if !Self::owns_run(&state, exam_id, generation_id) {
            return Err(PortError::Conflict(format!(
                "Generation {} no longer owns exam {}",
                generation_id, exam_id
            )));
        }

        state.generation_ids.remove(&exam_id);
        state.sessions.retain(|s| s.exam_id != exam_id);
        state.sessions.extend(sessions.into_iter().map(|s| StudySession {
            id: Uuid::new_v4(),
            exam_id: s.exam_id,
            user_id: s.user_id,
            date: s.date,
            duration_minutes: s.duration_minutes,
            method: s.method,
            topic: Some(s.topic),
            status: s.status,
        }));
        if let Some(exam) = state.exams.get_mut(&exam_id) {
            exam.generation_status = GenerationStatus::Generated;
            exam.generation_error = None;
        }
        state
            .transitions
            .push((exam_id, GenerationStatus::Generating, GenerationStatus::Generated));
        Ok(())
    }

    async fn get_other_exam_sessions(&self, user_id: Uuid, exam_id: Uuid) -> PortResult<Vec<StudySession>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.exam_id != exam_id)
            .cloned()
            .collect())
    }

    async fn get_sessions_for_exam(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<Vec<StudySession>> {
        {
            let mut state = self.state.lock().unwrap();
            Self::owned_exam(&mut state, exam_id, user_id)?;
        }
        Ok(self.sessions_of(exam_id))
    }

    async fn get_sessions_on(&self, user_id: Uuid, date: NaiveDate) -> PortResult<Vec<StudySession>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.date == date)
            .cloned()
            .collect())
    }
}

//=========================================================================================
// Fake PlacementService implementations
//=========================================================================================

/// Returns a fixed reply, optionally after a delay.
pub struct ScriptedPlacement {
    reply: Result<Vec<ProposedSession>, String>,
    delay: Duration,
    pub requests: Mutex<Vec<PlacementRequest>>,
}

impl ScriptedPlacement {
    pub fn replying(sessions: Vec<ProposedSession>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(sessions),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Err("slow capability gave up".to_string()),
            delay,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PlacementService for ScriptedPlacement {
    async fn propose(&self, request: &PlacementRequest) -> PortResult<Vec<ProposedSession>> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(PortError::Unexpected)
    }
}

/// Simulates the user raising the weekly target to 6 while a proposal is
/// being computed, then gives up after `delay`.
pub struct EditingPlacement {
    pub db: Arc<InMemoryDb>,
    pub user_id: Uuid,
    pub exam_id: Uuid,
    pub delay: Duration,
}

#[async_trait]
impl PlacementService for EditingPlacement {
    async fn propose(&self, _request: &PlacementRequest) -> PortResult<Vec<ProposedSession>> {
        let update = ExamUpdate {
            target_sessions_per_week: Some(6),
            ..ExamUpdate::default()
        };
        self.db.update_exam(self.exam_id, self.user_id, update).await?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Err(PortError::Unexpected("no proposal".to_string()))
    }
}
