use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::types::{ExamStatus, UserRole};
use crate::repositories;
use crate::schemas::exam::{ExamResponse, ExamUpdate};
use crate::services::grading_policy;

use super::super::helpers;
use super::super::queries::DeleteExamQuery;

pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    let is_owner = exam.teacher_id == user.id || user.role == UserRole::Admin;

    if !is_owner && exam.status != ExamStatus::Active {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    let response = helpers::exam_to_response(&state, exam, is_owner).await?;
    Ok(Json(response))
}

pub(in crate::api::exams) async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = helpers::fetch_owned_exam(&state, &teacher, &exam_id).await?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if exam.status != ExamStatus::Draft {
        return Err(ApiError::BadRequest("Only draft exams can be edited".to_string()));
    }

    let effective_total = payload.total_marks.unwrap_or(exam.total_marks);
    let effective_passing = payload.passing_marks.unwrap_or(exam.passing_marks);
    helpers::validate_marks(effective_total, effective_passing)?;

    let submission_deadline = payload.submission_deadline.map(to_primitive_utc);
    let effective_deadline = submission_deadline.unwrap_or(exam.submission_deadline);
    let effective_exam_date = payload.exam_date.unwrap_or(exam.exam_date);
    helpers::validate_deadline_after_exam_date(effective_exam_date, effective_deadline)?;

    repositories::exams::update(
        state.db(),
        &exam.id,
        repositories::exams::UpdateExam {
            title: payload.title,
            description: payload.description,
            total_marks: payload.total_marks,
            passing_marks: payload.passing_marks,
            exam_date: payload.exam_date,
            submission_deadline,
            duration_minutes: payload.duration_minutes,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;

    let response = helpers::exam_to_response(&state, updated, true).await?;
    Ok(Json(response))
}

pub(in crate::api::exams) async fn delete_exam(
    Path(exam_id): Path<String>,
    Query(params): Query<DeleteExamQuery>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<axum::http::StatusCode, ApiError> {
    let exam = helpers::fetch_owned_exam(&state, &teacher, &exam_id).await?;

    if exam.status != ExamStatus::Draft {
        return Err(ApiError::BadRequest("Only draft exams can be deleted".to_string()));
    }

    let submissions_count = repositories::exams::count_submissions(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    if submissions_count > 0 && !params.force_delete {
        return Err(ApiError::BadRequest(format!(
            "Cannot delete exam with {submissions_count} existing submission(s). Use force_delete=true to delete anyway."
        )));
    }

    repositories::exams::delete_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub(in crate::api::exams) async fn activate_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    change_status(state, teacher, exam_id, ExamStatus::Active).await
}

pub(in crate::api::exams) async fn close_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    change_status(state, teacher, exam_id, ExamStatus::Closed).await
}

pub(in crate::api::exams) async fn reopen_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    change_status(state, teacher, exam_id, ExamStatus::Draft).await
}

async fn change_status(
    state: AppState,
    teacher: crate::db::models::User,
    exam_id: String,
    to: ExamStatus,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = helpers::fetch_owned_exam(&state, &teacher, &exam_id).await?;

    let question_count = repositories::exams::count_questions(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    if let Err(denied) = grading_policy::exam_can_transition(exam.status, to, question_count) {
        return Err(ApiError::conflict(denied.code(), denied));
    }

    let now = primitive_now_utc();
    repositories::exams::set_status(state.db(), &exam.id, to, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update exam status"))?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;

    tracing::info!(
        teacher_id = %teacher.id,
        exam_id = %updated.id,
        status = ?updated.status,
        action = "exam_status_change",
        "Exam status changed"
    );

    let response = helpers::exam_to_response(&state, updated, true).await?;
    Ok(Json(response))
}
