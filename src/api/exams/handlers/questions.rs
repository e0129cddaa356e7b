use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::ExamStatus;
use crate::repositories;
use crate::schemas::exam::{QuestionCreate, QuestionResponse};

use super::super::helpers;

pub(in crate::api::exams) async fn add_question(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    let exam = helpers::fetch_owned_exam(&state, &teacher, &exam_id).await?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if exam.status != ExamStatus::Draft {
        return Err(ApiError::BadRequest(
            "Questions can only be added while the exam is a draft".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let question = repositories::questions::append(
        &mut tx,
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam.id,
            question_text: &payload.question_text,
            max_marks: payload.max_marks,
            answer_key_text: payload.answer_key_text.as_deref(),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question))))
}

/// Removes a question and renumbers the rest so numbering stays contiguous
/// from 1; the delete and the shift commit together.
pub(in crate::api::exams) async fn delete_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let exam = helpers::fetch_owned_exam(&state, &teacher, &exam_id).await?;

    if exam.status != ExamStatus::Draft {
        return Err(ApiError::BadRequest(
            "Questions can only be deleted while the exam is a draft".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let deleted =
        repositories::questions::delete_and_renumber(&mut tx, &exam.id, &question_id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    if deleted.is_none() {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        teacher_id = %teacher.id,
        exam_id = %exam.id,
        question_id = %question_id,
        action = "question_delete",
        "Question deleted and numbering compacted"
    );

    Ok(StatusCode::NO_CONTENT)
}
