mod helpers;
mod student;
mod teacher;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

/// Mounted under `/submissions`.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(student::create_submission))
        .route("/mine", get(student::my_submissions))
        .route("/:submission_id", get(teacher::get_submission))
        .route("/:submission_id/sheets", post(student::upload_sheet))
        .route("/:submission_id/process", post(student::process_ocr))
        .route("/:submission_id/ai-grade", post(teacher::ai_grade))
        .route("/:submission_id/grades", post(teacher::save_grades))
}

#[cfg(test)]
mod tests;
