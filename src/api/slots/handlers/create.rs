use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::SlotStatus;
use crate::repositories;
use crate::schemas::slot::{SlotCloseRequest, SlotCreate, SlotResponse};

pub(in crate::api::slots) async fn create_slot(
    Path(school_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SlotCreate>,
) -> Result<(StatusCode, Json<SlotResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if payload.end_time <= payload.start_time {
        return Err(ApiError::BadRequest("end_time must be after start_time".to_string()));
    }

    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;
    let Some(school) = school else {
        return Err(ApiError::NotFound("School not found".to_string()));
    };

    let slot = repositories::slots::create(
        state.db(),
        repositories::slots::CreateSlot {
            id: &Uuid::new_v4().to_string(),
            school_id: &school.id,
            slot_date: payload.slot_date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            teachers_required: payload.teachers_required,
            created_by: &admin.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create slot"))?;

    tracing::info!(
        admin_id = %admin.id,
        school_id = %school.id,
        slot_id = %slot.id,
        action = "slot_create",
        "Teaching slot created"
    );

    Ok((StatusCode::CREATED, Json(SlotResponse::from_db(slot))))
}

#[derive(Debug, Deserialize)]
pub(in crate::api::slots) struct ListSlotsQuery {
    #[serde(default)]
    status: Option<SlotStatus>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub(in crate::api::slots) async fn list_school_slots(
    Path(school_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    Query(params): Query<ListSlotsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SlotResponse>>, ApiError> {
    let items = repositories::slots::list_by_school(
        state.db(),
        &school_id,
        params.status,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list slots"))?;

    let total_count = repositories::slots::count_by_school(state.db(), &school_id, params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count slots"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(SlotResponse::from_db).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

/// Admin close-out: marks the slot completed (bookings become completed) or
/// cancelled (bookings are released and their sessions rejected).
pub(in crate::api::slots) async fn close_slot(
    Path(slot_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SlotCloseRequest>,
) -> Result<Json<SlotResponse>, ApiError> {
    if !matches!(payload.status, SlotStatus::Completed | SlotStatus::Cancelled) {
        return Err(ApiError::BadRequest(
            "status must be 'completed' or 'cancelled'".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let slot = repositories::slots::find_by_id_for_update(&mut tx, &slot_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch slot"))?;
    let Some(slot) = slot else {
        return Err(ApiError::NotFound("Slot not found".to_string()));
    };

    if matches!(slot.status, SlotStatus::Completed | SlotStatus::Cancelled) {
        return Err(ApiError::conflict("SlotUnavailable", "slot is already closed"));
    }

    match payload.status {
        SlotStatus::Completed => {
            repositories::slot_enrollments::complete_for_slot(&mut tx, &slot.id, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to complete bookings"))?;
        }
        SlotStatus::Cancelled => {
            repositories::slot_enrollments::cancel_for_slot(
                &mut tx,
                &slot.id,
                "Slot cancelled by school",
                now,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to release bookings"))?;
            repositories::teaching_sessions::reject_for_slot(&mut tx, &slot.id, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to reject sessions"))?;
        }
        _ => unreachable!(),
    }

    repositories::slots::set_terminal_status(&mut tx, &slot.id, payload.status, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update slot status"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let updated = repositories::slots::find_by_id(state.db(), &slot.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated slot"))?
        .ok_or_else(|| ApiError::Internal("Slot missing after update".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        slot_id = %updated.id,
        status = ?updated.status,
        action = "slot_close",
        "Teaching slot closed"
    );

    Ok(Json(SlotResponse::from_db(updated)))
}
