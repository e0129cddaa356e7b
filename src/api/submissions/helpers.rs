use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::{ObjectiveExam, ObjectiveSubmission, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::submission::SubmissionResponse;

/// Fetches the submission and its exam; the pair drives every access check.
pub(super) async fn fetch_submission_with_exam(
    state: &AppState,
    submission_id: &str,
) -> Result<(ObjectiveSubmission, ObjectiveExam), ApiError> {
    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?;

    let Some(submission) = submission else {
        return Err(ApiError::NotFound("Submission not found".to_string()));
    };

    let exam = repositories::exams::find_by_id(state.db(), &submission.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::Internal("Exam missing for submission".to_string()))?;

    Ok((submission, exam))
}

pub(super) fn is_exam_teacher(user: &User, exam: &ObjectiveExam) -> bool {
    exam.teacher_id == user.id || user.role == UserRole::Admin
}

pub(super) fn require_owner_or_teacher(
    user: &User,
    submission: &ObjectiveSubmission,
    exam: &ObjectiveExam,
) -> Result<(), ApiError> {
    if submission.student_id == user.id || is_exam_teacher(user, exam) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Access denied"))
    }
}

pub(super) async fn build_submission_response(
    state: &AppState,
    submission: ObjectiveSubmission,
) -> Result<SubmissionResponse, ApiError> {
    let sheets = repositories::grades::list_sheets(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answer sheets"))?;
    let grades = repositories::grades::list_by_submission(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch grades"))?;

    Ok(SubmissionResponse::from_db(submission, sheets, grades))
}
