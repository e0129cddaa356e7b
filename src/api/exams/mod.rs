mod handlers;
mod helpers;
mod queries;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

/// Mounted under `/schools/:school_id/exams`.
pub(crate) fn school_router() -> Router<AppState> {
    Router::new().route("/", post(handlers::create_exam).get(handlers::list_school_exams))
}

/// Mounted under `/exams`.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(handlers::list_my_exams))
        .route(
            "/:exam_id",
            get(handlers::get_exam).patch(handlers::update_exam).delete(handlers::delete_exam),
        )
        .route("/:exam_id/activate", post(handlers::activate_exam))
        .route("/:exam_id/close", post(handlers::close_exam))
        .route("/:exam_id/reopen", post(handlers::reopen_exam))
        .route("/:exam_id/questions", post(handlers::add_question))
        .route(
            "/:exam_id/questions/:question_id",
            axum::routing::delete(handlers::delete_question),
        )
        .route("/:exam_id/submissions", get(handlers::list_exam_submissions))
}

#[cfg(test)]
mod tests;
