mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

/// Mounted under `/schools/:school_id/slots`.
pub(crate) fn school_router() -> Router<AppState> {
    Router::new().route("/", post(handlers::create_slot).get(handlers::list_school_slots))
}

/// Mounted under `/slots`.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/open", get(handlers::list_open_slots))
        .route("/:slot_id", get(handlers::get_slot))
        .route("/:slot_id/book", post(handlers::book_slot))
        .route("/:slot_id/close", post(handlers::close_slot))
}

/// Mounted under `/enrollments`.
pub(crate) fn enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(handlers::my_enrollments))
        .route("/:enrollment_id/cancel", post(handlers::cancel_booking))
}
