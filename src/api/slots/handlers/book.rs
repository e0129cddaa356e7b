use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, to_primitive_utc};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::slot::BookingResponse;
use crate::services::booking_policy::{self, SlotSnapshot, TeacherBookingContext};

/// Books the calling teacher into a slot. The whole check-and-reserve runs
/// in one transaction with the slot row locked, so two requests racing for
/// the last spot serialize and the loser sees the updated count.
pub(in crate::api::slots) async fn book_slot(
    Path(slot_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    if user.role != UserRole::Teacher {
        return Err(ApiError::Forbidden("Only teachers can book teaching slots"));
    }

    let now = OffsetDateTime::now_utc();
    let now_primitive = to_primitive_utc(now);

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::slot_enrollments::lock_teacher_bookings(&mut tx, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to serialize booking"))?;

    let slot = repositories::slots::find_by_id_for_update(&mut tx, &slot_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch slot"))?;
    let Some(slot) = slot else {
        return Err(ApiError::NotFound("Slot not found".to_string()));
    };

    let booked_in_this_slot =
        repositories::slot_enrollments::is_booked_in_slot(&mut tx, &slot.id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check slot booking"))?;
    let has_active_booking =
        repositories::slot_enrollments::has_active_booking(&mut tx, &user.id, now.date())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check active bookings"))?;

    let snapshot = SlotSnapshot {
        status: slot.status,
        slot_date: slot.slot_date,
        start_time: slot.start_time,
        teachers_required: slot.teachers_required,
        teachers_enrolled: slot.teachers_enrolled,
    };
    let context = TeacherBookingContext { booked_in_this_slot, has_active_booking };

    if let Err(denied) = booking_policy::evaluate_booking(&snapshot, &context) {
        return Err(ApiError::conflict(denied.code(), denied));
    }

    let enrollment = repositories::slot_enrollments::create(
        &mut tx,
        repositories::slot_enrollments::CreateEnrollment {
            id: &Uuid::new_v4().to_string(),
            slot_id: &slot.id,
            teacher_id: &user.id,
            booked_at: now_primitive,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create enrollment"))?;

    let session = repositories::teaching_sessions::create_pending(
        &mut tx,
        &Uuid::new_v4().to_string(),
        &enrollment.id,
        now_primitive,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create teaching session"))?;

    let (teachers_enrolled, slot_status) =
        repositories::slots::recount_capacity(&mut tx, &slot, now_primitive)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update slot capacity"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        teacher_id = %user.id,
        slot_id = %slot.id,
        enrollment_id = %enrollment.id,
        teachers_enrolled,
        action = "slot_book",
        "Slot booked"
    );

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            enrollment_id: enrollment.id,
            slot_id: slot.id,
            session_id: session.id,
            status: enrollment.status,
            slot_status,
            teachers_enrolled,
            booked_at: format_primitive(enrollment.booked_at),
        }),
    ))
}
