pub mod agenda;
pub mod deriver;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod generation;
pub mod placement;
pub mod ports;

pub use agenda::{build_today_agenda, relative_date, TodayAgenda};
pub use deriver::{compute_start_date, derive_schedule_inputs, ScheduleInputs, WeekBucket, WeekKind};
pub use distribution::distribute;
pub use domain::{
    Exam, ExamUpdate, GenerationStatus, NewExam, NewStudySession, ProposedSession, RestDays,
    SessionStatus, StudySession, WhenToStart, MAX_SESSIONS_PER_WEEK,
};
pub use error::ScheduleError;
pub use generation::{GenerationOutcome, ScheduleGenerator};
pub use placement::{
    generate_deterministic_schedule, strict_validate, LockedConstraints, Placement,
    PlacementOrchestrator, PlacementRequest, PlacementSource, ValidationError,
};
pub use ports::{DatabaseService, PlacementService, PortError, PortResult};
