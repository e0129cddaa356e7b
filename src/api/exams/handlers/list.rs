use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::db::types::{ExamStatus, SchoolEnrollmentStatus, UserRole};
use crate::repositories;
use crate::schemas::exam::ExamSummaryResponse;
use crate::schemas::submission::SubmissionSummaryResponse;

use super::super::helpers;
use super::super::queries::{ListExamsQuery, ListSubmissionsQuery};

pub(in crate::api::exams) async fn list_school_exams(
    Path(school_id): Path<String>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListExamsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ExamSummaryResponse>>, ApiError> {
    // Students (and teachers outside this school) only see active exams.
    let sees_all = match user.role {
        UserRole::Admin => true,
        UserRole::Teacher => {
            let enrollment = repositories::school_enrollments::find_for_teacher_school(
                state.db(),
                &user.id,
                &school_id,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch school enrollment"))?;
            enrollment
                .map(|enrollment| enrollment.status == SchoolEnrollmentStatus::Active)
                .unwrap_or(false)
        }
        UserRole::Student => false,
    };

    let status = if sees_all { params.status } else { Some(ExamStatus::Active) };

    let items = repositories::exams::list_by_school(
        state.db(),
        &school_id,
        status,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let total_count = repositories::exams::count_by_school(state.db(), &school_id, status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(ExamSummaryResponse::from_db).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

pub(in crate::api::exams) async fn list_my_exams(
    CurrentTeacher(teacher): CurrentTeacher,
    Query(params): Query<ListExamsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamSummaryResponse>>, ApiError> {
    let items = repositories::exams::list_by_teacher(
        state.db(),
        &teacher.id,
        params.status,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(items.into_iter().map(ExamSummaryResponse::from_db).collect()))
}

pub(in crate::api::exams) async fn list_exam_submissions(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    Query(params): Query<ListSubmissionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SubmissionSummaryResponse>>, ApiError> {
    let exam = helpers::fetch_owned_exam(&state, &teacher, &exam_id).await?;

    let items = repositories::submissions::list_by_exam(
        state.db(),
        &exam.id,
        params.status,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
    let total_count = repositories::submissions::count_by_exam(state.db(), &exam.id, params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(SubmissionSummaryResponse::from_row).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}
