pub mod middleware;
pub mod rest;
pub mod schedule;
pub mod settings;
pub mod state;
pub mod today;

// Re-export the handlers to make them easily accessible to the binary that
// builds the web server router.
pub use middleware::require_auth;
pub use rest::{
    create_exam_handler, delete_exam_handler, list_exams_handler, list_sessions_handler,
    update_exam_handler,
};
pub use schedule::{generate_schedule_handler, reset_schedule_handler};
pub use settings::{get_rest_days_handler, update_rest_days_handler};
pub use today::today_handler;
