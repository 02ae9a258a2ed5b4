//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every operation that resets or replaces a schedule runs in a single
//! transaction, so readers never observe a half-replaced session set.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use study_planner_core::domain::{
    Exam, ExamUpdate, GenerationStatus, NewExam, NewStudySession, RestDays, SessionStatus,
    StudySession,
};
use study_planner_core::ports::{DatabaseService, PortError, PortResult};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Converts a count or duration to the `INTEGER` column type.
fn to_column(value: u32, column: &str) -> PortResult<i32> {
    i32::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("{} value {} is out of range", column, value)))
}

fn from_column(value: i32, column: &str) -> PortResult<u32> {
    u32::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("Stored {} value {} is negative", column, value)))
}

/// Rows per multi-row INSERT, well below the Postgres bind parameter limit.
const INSERT_CHUNK_ROWS: usize = 1000;

const EXAM_COLUMNS: &str = "id, user_id, title, subject, study_methods, preferences, exam_date, \
     target_sessions_per_week, session_length_minutes, when_to_start_studying, \
     generation_status, generation_error, created_at";

const SESSION_COLUMNS: &str =
    "id, exam_id, user_id, date, duration_minutes, method, topic, status";

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ExamRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    subject: Option<String>,
    study_methods: Vec<String>,
    preferences: Option<String>,
    exam_date: NaiveDate,
    target_sessions_per_week: i32,
    session_length_minutes: i32,
    when_to_start_studying: String,
    generation_status: String,
    generation_error: Option<String>,
    created_at: DateTime<Utc>,
}
impl ExamRecord {
    fn to_domain(self) -> PortResult<Exam> {
        let generation_status = self
            .generation_status
            .parse::<GenerationStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Exam {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            subject: self.subject,
            study_methods: self.study_methods,
            preferences: self.preferences,
            exam_date: self.exam_date,
            target_sessions_per_week: from_column(
                self.target_sessions_per_week,
                "target_sessions_per_week",
            )?,
            session_length_minutes: from_column(
                self.session_length_minutes,
                "session_length_minutes",
            )?,
            when_to_start_studying: self.when_to_start_studying,
            generation_status,
            generation_error: self.generation_error,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct StudySessionRecord {
    id: Uuid,
    exam_id: Uuid,
    user_id: Uuid,
    date: NaiveDate,
    duration_minutes: i32,
    method: String,
    topic: Option<String>,
    status: String,
}
impl StudySessionRecord {
    fn to_domain(self) -> PortResult<StudySession> {
        let status = self
            .status
            .parse::<SessionStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(StudySession {
            id: self.id,
            exam_id: self.exam_id,
            user_id: self.user_id,
            date: self.date,
            duration_minutes: from_column(self.duration_minutes, "duration_minutes")?,
            method: self.method,
            topic: self.topic,
            status,
        })
    }
}

fn sessions_to_domain(records: Vec<StudySessionRecord>) -> PortResult<Vec<StudySession>> {
    records.into_iter().map(|r| r.to_domain()).collect()
}

//=========================================================================================
// Transaction Helpers
//=========================================================================================

/// Locks the exam row for the rest of the transaction and checks ownership.
async fn lock_owned_exam(
    tx: &mut Transaction<'_, Postgres>,
    exam_id: Uuid,
    user_id: Uuid,
) -> PortResult<Exam> {
    let sql = format!("SELECT {} FROM exams WHERE id = $1 FOR UPDATE", EXAM_COLUMNS);
    let record = sqlx::query_as::<_, ExamRecord>(&sql)
        .bind(exam_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Exam {} not found", exam_id)))?;

    if record.user_id != user_id {
        return Err(PortError::Unauthorized);
    }
    record.to_domain()
}

/// Deletes the exam's sessions and puts it back to `NONE` with no reason.
/// A running generation loses ownership.
async fn reset_exam_schedule(tx: &mut Transaction<'_, Postgres>, exam_id: Uuid) -> PortResult<()> {
    sqlx::query("DELETE FROM study_sessions WHERE exam_id = $1")
        .bind(exam_id)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;

    sqlx::query(
        "UPDATE exams SET generation_status = 'NONE', generation_error = NULL, \
         generation_id = NULL WHERE id = $1",
    )
    .bind(exam_id)
    .execute(&mut **tx)
    .await
    .map_err(unexpected)?;
    Ok(())
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn get_exam_for_user(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<Exam> {
        let sql = format!("SELECT {} FROM exams WHERE id = $1", EXAM_COLUMNS);
        let record = sqlx::query_as::<_, ExamRecord>(&sql)
            .bind(exam_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => PortError::NotFound(format!("Exam {} not found", exam_id)),
                _ => unexpected(e),
            })?;

        if record.user_id != user_id {
            return Err(PortError::Unauthorized);
        }
        record.to_domain()
    }

    async fn list_exams(&self, user_id: Uuid) -> PortResult<Vec<Exam>> {
        let sql = format!(
            "SELECT {} FROM exams WHERE user_id = $1 ORDER BY exam_date ASC, created_at ASC",
            EXAM_COLUMNS
        );
        let records = sqlx::query_as::<_, ExamRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn create_exam(&self, user_id: Uuid, exam: NewExam) -> PortResult<Exam> {
        let target = to_column(exam.target_sessions_per_week, "target_sessions_per_week")?;
        let length = to_column(exam.session_length_minutes, "session_length_minutes")?;
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let sql = format!(
            "INSERT INTO exams (id, user_id, title, subject, study_methods, preferences, exam_date, \
             target_sessions_per_week, session_length_minutes, when_to_start_studying) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            EXAM_COLUMNS
        );
        let record = sqlx::query_as::<_, ExamRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&exam.title)
            .bind(&exam.subject)
            .bind(&exam.study_methods)
            .bind(&exam.preferences)
            .bind(exam.exam_date)
            .bind(target)
            .bind(length)
            .bind(&exam.when_to_start_studying)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_exam(&self, exam_id: Uuid, user_id: Uuid, update: ExamUpdate) -> PortResult<Exam> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut exam = lock_owned_exam(&mut tx, exam_id, user_id).await?;
        update.apply_to(&mut exam);
        let target = to_column(exam.target_sessions_per_week, "target_sessions_per_week")?;
        let length = to_column(exam.session_length_minutes, "session_length_minutes")?;

        sqlx::query(
            "UPDATE exams SET title = $2, subject = $3, study_methods = $4, preferences = $5, \
             exam_date = $6, target_sessions_per_week = $7, session_length_minutes = $8, \
             when_to_start_studying = $9 WHERE id = $1",
        )
        .bind(exam_id)
        .bind(&exam.title)
        .bind(&exam.subject)
        .bind(&exam.study_methods)
        .bind(&exam.preferences)
        .bind(exam.exam_date)
        .bind(target)
        .bind(length)
        .bind(&exam.when_to_start_studying)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        reset_exam_schedule(&mut tx, exam_id).await?;
        tx.commit().await.map_err(unexpected)?;

        debug!(%exam_id, "Exam updated and schedule reset");
        exam.generation_status = GenerationStatus::None;
        exam.generation_error = None;
        Ok(exam)
    }

    async fn delete_exam(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        lock_owned_exam(&mut tx, exam_id, user_id).await?;

        // Sessions go with the exam through ON DELETE CASCADE.
        sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        debug!(%exam_id, "Exam deleted");
        Ok(())
    }

    async fn reset_schedule(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        lock_owned_exam(&mut tx, exam_id, user_id).await?;
        reset_exam_schedule(&mut tx, exam_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn get_rest_days(&self, user_id: Uuid) -> PortResult<RestDays> {
        let names = sqlx::query_scalar::<_, Vec<String>>(
            "SELECT rest_days FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .unwrap_or_default();

        RestDays::from_names(&names).map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn update_rest_days(&self, user_id: Uuid, rest_days: RestDays) -> PortResult<RestDays> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO users (user_id, rest_days) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET rest_days = EXCLUDED.rest_days",
        )
        .bind(user_id)
        .bind(rest_days.names())
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query("DELETE FROM study_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let reset = sqlx::query(
            "UPDATE exams SET generation_status = 'NONE', generation_error = NULL, \
             generation_id = NULL WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        debug!(%user_id, exams_reset = reset.rows_affected(), "Rest days updated");
        Ok(rest_days)
    }

    async fn claim_generation(&self, exam_id: Uuid) -> PortResult<Option<Uuid>> {
        let generation_id = Uuid::new_v4();
        let claimed = sqlx::query(
            "UPDATE exams SET generation_status = 'GENERATING', generation_error = NULL, \
             generation_id = $2 WHERE id = $1 AND generation_status = 'NONE'",
        )
        .bind(exam_id)
        .bind(generation_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok((claimed.rows_affected() == 1).then_some(generation_id))
    }

    async fn record_failure(&self, exam_id: Uuid, reason: &str) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE exams SET generation_status = 'FAILED', generation_error = $2 \
             WHERE id = $1 AND generation_status = 'NONE'",
        )
        .bind(exam_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail_generation(&self, exam_id: Uuid, generation_id: Uuid, reason: &str) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE exams SET generation_status = 'FAILED', generation_error = $3, generation_id = NULL \
             WHERE id = $1 AND generation_status = 'GENERATING' AND generation_id = $2",
        )
        .bind(exam_id)
        .bind(generation_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit_schedule(
        &self,
        exam_id: Uuid,
        generation_id: Uuid,
        sessions: Vec<NewStudySession>,
    ) -> PortResult<()> {
        let durations = sessions
            .iter()
            .map(|s| to_column(s.duration_minutes, "duration_minutes"))
            .collect::<PortResult<Vec<i32>>>()?;

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Takes the row lock first; a concurrent edit either finished before
        // (the run lost ownership and we bail out) or waits for this commit.
        let marked = sqlx::query(
            "UPDATE exams SET generation_status = 'GENERATED', generation_error = NULL, \
             generation_id = NULL \
             WHERE id = $1 AND generation_status = 'GENERATING' AND generation_id = $2",
        )
        .bind(exam_id)
        .bind(generation_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        if marked.rows_affected() != 1 {
            tx.rollback().await.map_err(unexpected)?;
            return Err(PortError::Conflict(format!(
                "Generation {} no longer owns exam {}",
                generation_id, exam_id
            )));
        }

        sqlx::query("DELETE FROM study_sessions WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let rows: Vec<(&NewStudySession, i32)> = sessions.iter().zip(durations).collect();
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut insert: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO study_sessions \
                 (id, exam_id, user_id, date, duration_minutes, method, topic, status) ",
            );
            insert.push_values(chunk, |mut row, (session, duration)| {
                row.push_bind(Uuid::new_v4())
                    .push_bind(session.exam_id)
                    .push_bind(session.user_id)
                    .push_bind(session.date)
                    .push_bind(*duration)
                    .push_bind(session.method.as_str())
                    .push_bind(session.topic.as_str())
                    .push_bind(session.status.as_str());
            });
            insert.build().execute(&mut *tx).await.map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        debug!(%exam_id, %generation_id, inserted = sessions.len(), "Schedule committed");
        Ok(())
    }

    async fn get_other_exam_sessions(&self, user_id: Uuid, exam_id: Uuid) -> PortResult<Vec<StudySession>> {
        let sql = format!(
            "SELECT {} FROM study_sessions WHERE user_id = $1 AND exam_id <> $2 ORDER BY date ASC",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, StudySessionRecord>(&sql)
            .bind(user_id)
            .bind(exam_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        sessions_to_domain(records)
    }

    async fn get_sessions_for_exam(&self, exam_id: Uuid, user_id: Uuid) -> PortResult<Vec<StudySession>> {
        self.get_exam_for_user(exam_id, user_id).await?;

        let sql = format!(
            "SELECT {} FROM study_sessions WHERE exam_id = $1 ORDER BY date ASC, created_at ASC",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, StudySessionRecord>(&sql)
            .bind(exam_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        sessions_to_domain(records)
    }

    async fn get_sessions_on(&self, user_id: Uuid, date: NaiveDate) -> PortResult<Vec<StudySession>> {
        let sql = format!(
            "SELECT {} FROM study_sessions WHERE user_id = $1 AND date = $2 ORDER BY created_at ASC",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, StudySessionRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        sessions_to_domain(records)
    }
}
