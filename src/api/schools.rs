use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentTeacher, CurrentUser};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{SchoolEnrollmentStatus, SchoolStatus, UserRole};
use crate::repositories;
use crate::schemas::school::{
    EnrollTeacherRequest, EnrollmentUpdateRequest, SchoolCreate, SchoolEnrollmentResponse,
    SchoolResponse, SchoolUpdate,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_school).get(list_schools))
        .route("/mine", get(my_enrollments))
        .route("/:school_id", get(get_school).patch(update_school))
        .route("/:school_id/enrollments", post(enroll_teacher).get(list_enrollments))
        .route("/:school_id/enrollments/:teacher_id", axum::routing::patch(update_enrollment))
        .nest("/:school_id/slots", crate::api::slots::school_router())
        .nest("/:school_id/exams", crate::api::exams::school_router())
}

#[derive(Debug, Deserialize)]
struct ListSchoolsQuery {
    #[serde(default)]
    status: Option<SchoolStatus>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

async fn create_school(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SchoolCreate>,
) -> Result<(StatusCode, Json<SchoolResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = repositories::schools::exists_by_code(state.db(), &payload.code)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check school code"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("School with this code already exists".to_string()));
    }

    let now = primitive_now_utc();
    let school = repositories::schools::create(
        state.db(),
        repositories::schools::CreateSchool {
            id: &Uuid::new_v4().to_string(),
            name: &payload.name,
            code: &payload.code,
            address: &payload.address,
            latitude: payload.latitude,
            longitude: payload.longitude,
            allowed_radius_m: payload.allowed_radius_m,
            status: SchoolStatus::Active,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create school"))?;

    tracing::info!(
        admin_id = %admin.id,
        school_id = %school.id,
        action = "school_create",
        "School created"
    );

    Ok((StatusCode::CREATED, Json(SchoolResponse::from_db(school))))
}

async fn list_schools(
    CurrentUser(_user): CurrentUser,
    Query(params): Query<ListSchoolsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SchoolResponse>>, ApiError> {
    let items = repositories::schools::list(state.db(), params.status, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list schools"))?;
    let total_count = repositories::schools::count(state.db(), params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count schools"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(SchoolResponse::from_db).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn get_school(
    Path(school_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SchoolResponse>, ApiError> {
    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;

    let Some(school) = school else {
        return Err(ApiError::NotFound("School not found".to_string()));
    };

    Ok(Json(SchoolResponse::from_db(school)))
}

async fn update_school(
    Path(school_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SchoolUpdate>,
) -> Result<Json<SchoolResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;

    let Some(school) = school else {
        return Err(ApiError::NotFound("School not found".to_string()));
    };

    repositories::schools::update(
        state.db(),
        &school.id,
        repositories::schools::UpdateSchool {
            name: payload.name,
            address: payload.address,
            latitude: payload.latitude,
            longitude: payload.longitude,
            allowed_radius_m: payload.allowed_radius_m,
            status: payload.status,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update school"))?;

    let updated = repositories::schools::fetch_one_by_id(state.db(), &school.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated school"))?;

    Ok(Json(SchoolResponse::from_db(updated)))
}

async fn enroll_teacher(
    Path(school_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<EnrollTeacherRequest>,
) -> Result<(StatusCode, Json<SchoolEnrollmentResponse>), ApiError> {
    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;
    let Some(school) = school else {
        return Err(ApiError::NotFound("School not found".to_string()));
    };

    let teacher = repositories::users::find_by_id(state.db(), &payload.teacher_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch teacher"))?;
    let Some(teacher) = teacher else {
        return Err(ApiError::NotFound("Teacher not found".to_string()));
    };
    if teacher.role != UserRole::Teacher {
        return Err(ApiError::BadRequest("Only teachers can be enrolled in schools".to_string()));
    }

    let existing = repositories::school_enrollments::find_for_teacher_school(
        state.db(),
        &teacher.id,
        &school.id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check existing enrollment"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "Teacher is already enrolled in this school".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let enrollment = repositories::school_enrollments::create(
        &mut tx,
        repositories::school_enrollments::CreateEnrollment {
            id: &Uuid::new_v4().to_string(),
            school_id: &school.id,
            teacher_id: &teacher.id,
            is_primary: payload.is_primary,
            status: SchoolEnrollmentStatus::Active,
            enrolled_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create enrollment"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        admin_id = %admin.id,
        school_id = %school.id,
        teacher_id = %teacher.id,
        action = "school_enroll",
        "Teacher enrolled into school"
    );

    Ok((StatusCode::CREATED, Json(SchoolEnrollmentResponse::from_db(enrollment))))
}

async fn list_enrollments(
    Path(school_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<SchoolEnrollmentResponse>>, ApiError> {
    let enrollments = repositories::school_enrollments::list_by_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(enrollments.into_iter().map(SchoolEnrollmentResponse::from_db).collect()))
}

async fn update_enrollment(
    Path((school_id, teacher_id)): Path<(String, String)>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentUpdateRequest>,
) -> Result<Json<SchoolEnrollmentResponse>, ApiError> {
    let existing = repositories::school_enrollments::find_for_teacher_school(
        state.db(),
        &teacher_id,
        &school_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?;
    if existing.is_none() {
        return Err(ApiError::NotFound("Enrollment not found".to_string()));
    }

    let now = primitive_now_utc();

    if let Some(status) = payload.status {
        repositories::school_enrollments::update_status(
            state.db(),
            &teacher_id,
            &school_id,
            status,
            now,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update enrollment status"))?;
    }

    if payload.is_primary == Some(true) {
        let mut tx = state
            .db()
            .begin()
            .await
            .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
        repositories::school_enrollments::set_primary(&mut tx, &teacher_id, &school_id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to set primary school"))?;
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
    }

    let updated = repositories::school_enrollments::find_for_teacher_school(
        state.db(),
        &teacher_id,
        &school_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch updated enrollment"))?
    .ok_or_else(|| ApiError::Internal("Enrollment missing after update".to_string()))?;

    Ok(Json(SchoolEnrollmentResponse::from_db(updated)))
}

async fn my_enrollments(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<SchoolEnrollmentResponse>>, ApiError> {
    let enrollments = repositories::school_enrollments::list_by_teacher(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(enrollments.into_iter().map(SchoolEnrollmentResponse::from_db).collect()))
}
