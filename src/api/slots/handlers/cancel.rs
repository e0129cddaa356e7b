use axum::{
    extract::{Path, State},
    Json,
};
use time::OffsetDateTime;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::to_primitive_utc;
use crate::repositories;
use crate::schemas::slot::{CancelBookingRequest, EnrollmentHistoryResponse, EnrollmentResponse};
use crate::services::booking_policy;

/// Cancels the calling teacher's booking. Ownership check, rule checks, the
/// enrollment update, the session rejection and the capacity recount all run
/// inside one transaction with the enrollment and slot rows locked; any
/// failure rolls the whole sequence back.
pub(in crate::api::slots) async fn cancel_booking(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CancelBookingRequest>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = OffsetDateTime::now_utc();
    let now_primitive = to_primitive_utc(now);

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let enrollment = repositories::slot_enrollments::find_by_id_for_update(&mut tx, &enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?;
    let Some(enrollment) = enrollment else {
        return Err(ApiError::NotFound("Booking not found".to_string()));
    };

    if enrollment.teacher_id != user.id {
        return Err(ApiError::Forbidden("You can only cancel your own bookings"));
    }

    let slot = repositories::slots::find_by_id_for_update(&mut tx, &enrollment.slot_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch slot"))?
        .ok_or_else(|| ApiError::Internal("Slot missing for enrollment".to_string()))?;

    if let Err(denied) = booking_policy::evaluate_cancellation(
        enrollment.status,
        slot.slot_date,
        slot.start_time,
        now,
    ) {
        return Err(ApiError::conflict(denied.code(), denied));
    }

    repositories::slot_enrollments::cancel(&mut tx, &enrollment.id, &payload.reason, now_primitive)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to cancel booking"))?;

    repositories::teaching_sessions::reject_for_enrollment(&mut tx, &enrollment.id, now_primitive)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reject teaching session"))?;

    repositories::slots::recount_capacity(&mut tx, &slot, now_primitive)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update slot capacity"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        teacher_id = %user.id,
        enrollment_id = %enrollment.id,
        slot_id = %slot.id,
        action = "slot_cancel",
        "Booking cancelled"
    );

    let updated = repositories::slot_enrollments::find_by_id(state.db(), &enrollment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated booking"))?
        .ok_or_else(|| ApiError::Internal("Booking missing after cancel".to_string()))?;

    Ok(Json(EnrollmentResponse::from_db(updated)))
}

pub(in crate::api::slots) async fn my_enrollments(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrollmentHistoryResponse>>, ApiError> {
    let rows = repositories::slot_enrollments::list_by_teacher_with_slot(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list bookings"))?;

    Ok(Json(rows.into_iter().map(EnrollmentHistoryResponse::from_row).collect()))
}
