use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_school_enrollment, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamResponse};

use super::super::helpers;

pub(in crate::api::exams) async fn create_exam(
    Path(school_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    require_school_enrollment(&state, &teacher, &school_id).await?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;
    let Some(school) = school else {
        return Err(ApiError::NotFound("School not found".to_string()));
    };

    let submission_deadline = to_primitive_utc(payload.submission_deadline);
    helpers::validate_deadline_after_exam_date(payload.exam_date, submission_deadline)?;
    helpers::validate_marks(payload.total_marks, payload.passing_marks)?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        &mut tx,
        repositories::exams::CreateExam {
            id: &exam_id,
            school_id: &school.id,
            teacher_id: &teacher.id,
            title: &payload.title,
            description: payload.description.as_deref(),
            grading_mode: payload.grading_mode,
            total_marks: payload.total_marks,
            passing_marks: payload.passing_marks,
            exam_date: payload.exam_date,
            submission_deadline,
            duration_minutes: payload.duration_minutes,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    for question in &payload.questions {
        repositories::questions::append(
            &mut tx,
            repositories::questions::CreateQuestion {
                id: &Uuid::new_v4().to_string(),
                exam_id: &exam.id,
                question_text: &question.question_text,
                max_marks: question.max_marks,
                answer_key_text: question.answer_key_text.as_deref(),
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create question"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        teacher_id = %teacher.id,
        school_id = %school.id,
        exam_id = %exam.id,
        grading_mode = ?exam.grading_mode,
        action = "exam_create",
        "Objective exam created"
    );

    let response = helpers::exam_to_response(&state, exam, true).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
