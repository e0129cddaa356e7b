use axum::{
    extract::{Path, Query, State},
    Json,
};
use time::OffsetDateTime;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::PageQuery;
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::slot::{OpenSlotResponse, SlotResponse};
use crate::services::booking_policy::{self, SlotSnapshot, TeacherBookingContext};

/// Browse view for teachers: upcoming bookable slots, each labelled with the
/// same eligibility verdict the booking endpoint enforces.
pub(in crate::api::slots) async fn list_open_slots(
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<OpenSlotResponse>>, ApiError> {
    if user.role != UserRole::Teacher {
        return Err(ApiError::Forbidden("Only teachers can browse teaching slots"));
    }

    let today = OffsetDateTime::now_utc().date();

    let slots = repositories::slots::list_open_upcoming(state.db(), today, page.skip, page.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list open slots"))?;

    let has_active_booking =
        repositories::slot_enrollments::has_active_booking_pool(state.db(), &user.id, today)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check active bookings"))?;

    let slot_ids: Vec<String> = slots.iter().map(|slot| slot.id.clone()).collect();
    let booked_ids = repositories::slot_enrollments::booked_slot_ids_for_teacher(
        state.db(),
        &user.id,
        &slot_ids,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check slot bookings"))?;

    let items = slots
        .into_iter()
        .map(|slot| {
            let snapshot = SlotSnapshot {
                status: slot.status,
                slot_date: slot.slot_date,
                start_time: slot.start_time,
                teachers_required: slot.teachers_required,
                teachers_enrolled: slot.teachers_enrolled,
            };
            let context = TeacherBookingContext {
                booked_in_this_slot: booked_ids.contains(&slot.id),
                has_active_booking,
            };
            let verdict = booking_policy::evaluate_booking(&snapshot, &context);
            OpenSlotResponse {
                slot: SlotResponse::from_db(slot),
                can_book: verdict.is_ok(),
                deny_reason: verdict.err().map(|denied| denied.code().to_string()),
            }
        })
        .collect();

    Ok(Json(items))
}

pub(in crate::api::slots) async fn get_slot(
    Path(slot_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SlotResponse>, ApiError> {
    let slot = repositories::slots::find_by_id(state.db(), &slot_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch slot"))?;

    let Some(slot) = slot else {
        return Err(ApiError::NotFound("Slot not found".to_string()));
    };

    Ok(Json(SlotResponse::from_db(slot)))
}
