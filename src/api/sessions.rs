use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::validation::validate_image_upload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{School, SlotEnrollment, TeachingSession};
use crate::db::types::{EnrollmentStatus, SessionStatus, UserRole};
use crate::repositories;
use crate::schemas::session::{SessionResponse, VerifySessionRequest};
use crate::services::geo;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:session_id", get(get_session))
        .route("/:session_id/verify", post(verify_session))
        .route("/enrollments/:enrollment_id/start-photo", post(submit_start_photo))
        .route("/enrollments/:enrollment_id/end-photo", post(submit_end_photo))
}

struct PhotoUpload {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
    latitude: f64,
    longitude: f64,
}

async fn get_session(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = repositories::teaching_sessions::find_by_id(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch session"))?;
    let Some(session) = session else {
        return Err(ApiError::NotFound("Session not found".to_string()));
    };

    let enrollment = fetch_enrollment(&state, &session.enrollment_id).await?;
    if enrollment.teacher_id != user.id && user.role != UserRole::Admin {
        return Err(ApiError::Forbidden("Access denied"));
    }

    Ok(Json(SessionResponse::from_db(session)))
}

/// Start-of-session proof: photo plus GPS fix, compared against the school
/// location. pending -> photo_submitted.
async fn submit_start_photo(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SessionResponse>, ApiError> {
    let enrollment = fetch_enrollment(&state, &enrollment_id).await?;
    if enrollment.teacher_id != user.id {
        return Err(ApiError::Forbidden("You can only submit photos for your own sessions"));
    }
    if enrollment.status != EnrollmentStatus::Booked {
        return Err(ApiError::conflict("AlreadyCancelled", "this booking is not active"));
    }

    let session = fetch_session_for_enrollment(&state, &enrollment.id).await?;
    if session.status != SessionStatus::Pending {
        return Err(ApiError::conflict(
            "InvalidSessionState",
            "start photo has already been submitted",
        ));
    }

    let school = fetch_school_for_enrollment(&state, &enrollment).await?;
    let upload = read_photo_upload(&state, multipart).await?;

    let distance = geo::haversine_distance_m(
        upload.latitude,
        upload.longitude,
        school.latitude,
        school.longitude,
    );
    let within_radius = distance <= school.allowed_radius_m;

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("Object storage not configured".to_string()))?;
    let key = format!("sessions/{}/start_{}", session.id, upload.filename);
    storage
        .upload_bytes(&key, &upload.content_type, upload.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store session photo"))?;

    repositories::teaching_sessions::record_start_photo(
        state.db(),
        &session.id,
        repositories::teaching_sessions::StartPhotoUpdate {
            photo_path: &key,
            latitude: upload.latitude,
            longitude: upload.longitude,
            distance_from_school_m: distance,
            within_radius,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record session photo"))?;

    tracing::info!(
        teacher_id = %user.id,
        session_id = %session.id,
        distance_m = distance,
        within_radius,
        action = "session_start_photo",
        "Session start photo submitted"
    );

    let updated = fetch_session_for_enrollment(&state, &enrollment.id).await?;
    Ok(Json(SessionResponse::from_db(updated)))
}

async fn submit_end_photo(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SessionResponse>, ApiError> {
    let enrollment = fetch_enrollment(&state, &enrollment_id).await?;
    if enrollment.teacher_id != user.id {
        return Err(ApiError::Forbidden("You can only submit photos for your own sessions"));
    }

    let session = fetch_session_for_enrollment(&state, &enrollment.id).await?;
    if session.status != SessionStatus::PhotoSubmitted {
        return Err(ApiError::conflict(
            "InvalidSessionState",
            "submit the start photo before the end photo",
        ));
    }

    let upload = read_photo_upload(&state, multipart).await?;

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("Object storage not configured".to_string()))?;
    let key = format!("sessions/{}/end_{}", session.id, upload.filename);
    storage
        .upload_bytes(&key, &upload.content_type, upload.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store session photo"))?;

    repositories::teaching_sessions::record_end_photo(
        state.db(),
        &session.id,
        repositories::teaching_sessions::EndPhotoUpdate {
            photo_path: &key,
            latitude: upload.latitude,
            longitude: upload.longitude,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record session photo"))?;

    let updated = fetch_session_for_enrollment(&state, &enrollment.id).await?;
    Ok(Json(SessionResponse::from_db(updated)))
}

async fn verify_session(
    Path(session_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<VerifySessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = repositories::teaching_sessions::find_by_id(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch session"))?;
    let Some(session) = session else {
        return Err(ApiError::NotFound("Session not found".to_string()));
    };

    if session.status != SessionStatus::PhotoSubmitted {
        return Err(ApiError::conflict(
            "InvalidSessionState",
            "only sessions awaiting verification can be verified",
        ));
    }

    let status = if payload.approve { SessionStatus::Approved } else { SessionStatus::Rejected };

    repositories::teaching_sessions::verify(
        state.db(),
        &session.id,
        status,
        payload.note,
        &admin.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to verify session"))?;

    tracing::info!(
        admin_id = %admin.id,
        session_id = %session.id,
        approved = payload.approve,
        action = "session_verify",
        "Session verified"
    );

    let updated = repositories::teaching_sessions::find_by_id(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated session"))?
        .ok_or_else(|| ApiError::Internal("Session missing after verify".to_string()))?;

    Ok(Json(SessionResponse::from_db(updated)))
}

async fn fetch_enrollment(
    state: &AppState,
    enrollment_id: &str,
) -> Result<SlotEnrollment, ApiError> {
    repositories::slot_enrollments::find_by_id(state.db(), enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))
}

async fn fetch_session_for_enrollment(
    state: &AppState,
    enrollment_id: &str,
) -> Result<TeachingSession, ApiError> {
    repositories::teaching_sessions::find_by_enrollment(state.db(), enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

async fn fetch_school_for_enrollment(
    state: &AppState,
    enrollment: &SlotEnrollment,
) -> Result<School, ApiError> {
    let slot = repositories::slots::find_by_id(state.db(), &enrollment.slot_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch slot"))?
        .ok_or_else(|| ApiError::Internal("Slot missing for enrollment".to_string()))?;

    repositories::schools::find_by_id(state.db(), &slot.school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?
        .ok_or_else(|| ApiError::Internal("School missing for slot".to_string()))
}

async fn read_photo_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<PhotoUpload, ApiError> {
    let mut filename = None;
    let mut content_type = None;
    let mut bytes = None;
    let mut latitude = None;
    let mut longitude = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                filename = field.file_name().map(str::to_string);
                content_type = field.content_type().map(str::to_string);
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?
                        .to_vec(),
                );
            }
            Some("latitude") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid latitude: {e}")))?;
                latitude = Some(
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| ApiError::BadRequest("Invalid latitude".to_string()))?,
                );
            }
            Some("longitude") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid longitude: {e}")))?;
                longitude = Some(
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| ApiError::BadRequest("Invalid longitude".to_string()))?,
                );
            }
            _ => {}
        }
    }

    let filename =
        filename.ok_or_else(|| ApiError::BadRequest("File must have a filename".to_string()))?;
    let content_type = content_type
        .ok_or_else(|| ApiError::BadRequest("File must have a content type".to_string()))?;
    let bytes = bytes.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;
    let latitude =
        latitude.ok_or_else(|| ApiError::BadRequest("Missing latitude field".to_string()))?;
    let longitude =
        longitude.ok_or_else(|| ApiError::BadRequest("Missing longitude field".to_string()))?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::BadRequest("GPS coordinates out of range".to_string()));
    }

    validate_image_upload(
        &filename,
        &content_type,
        &state.settings().storage().allowed_image_extensions,
    )?;

    let max_bytes = state.settings().storage().max_upload_size_mb * 1024 * 1024;
    if bytes.len() as u64 > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File exceeds the {} MB upload limit",
            state.settings().storage().max_upload_size_mb
        )));
    }

    Ok(PhotoUpload { filename, content_type, bytes, latitude, longitude })
}
