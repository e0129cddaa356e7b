use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{GradingMode, SubmissionStatus};
use crate::repositories;
use crate::schemas::submission::{SaveGradesRequest, SubmissionResponse};
use crate::services::ai_grading::{GraderService, QuestionForGrading};
use crate::services::grading_policy;

use super::helpers;

pub(super) async fn get_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let (submission, exam) = helpers::fetch_submission_with_exam(&state, &submission_id).await?;
    helpers::require_owner_or_teacher(&user, &submission, &exam)?;

    let response = helpers::build_submission_response(&state, submission).await?;
    Ok(Json(response))
}

/// Runs the AI grading collaborator: ocr_complete -> grading -> graded, or
/// -> error when the collaborator fails. Grade rows, the aggregate and the
/// status flip commit together.
pub(super) async fn ai_grade(
    Path(submission_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let (submission, exam) = helpers::fetch_submission_with_exam(&state, &submission_id).await?;

    if !helpers::is_exam_teacher(&teacher, &exam) {
        return Err(ApiError::Forbidden("You do not own this exam"));
    }

    if exam.grading_mode != GradingMode::Ai {
        return Err(ApiError::BadRequest(
            "This exam is graded manually; AI grading is not available".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let started = repositories::submissions::transition_status(
        state.db(),
        &submission.id,
        SubmissionStatus::OcrComplete,
        SubmissionStatus::Grading,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to start AI grading"))?;

    if !started {
        return Err(ApiError::Conflict(
            "Submission is not ready for AI grading; OCR must complete first".to_string(),
        ));
    }

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;
    let ocr_text = submission.ocr_text.clone().unwrap_or_default();

    let grader = GraderService::from_settings(state.settings())
        .map_err(|e| ApiError::internal(e, "Failed to build grader client"))?;

    let question_inputs: Vec<QuestionForGrading> = questions
        .iter()
        .map(|question| QuestionForGrading {
            question_id: question.id.clone(),
            question_number: question.question_number,
            question_text: question.question_text.clone(),
            max_marks: question.max_marks,
            answer_key_text: question.answer_key_text.clone(),
        })
        .collect();

    let graded = grader.grade_submission(&exam.title, &ocr_text, &question_inputs).await;

    let now = primitive_now_utc();
    let updated = match graded {
        Ok(grades) => {
            let max_marks_by_question: HashMap<&str, f64> = questions
                .iter()
                .map(|question| (question.id.as_str(), question.max_marks))
                .collect();

            let mut tx = state
                .db()
                .begin()
                .await
                .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

            let locked =
                repositories::submissions::find_by_id_for_update(&mut tx, &submission.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to lock submission"))?
                    .ok_or_else(|| {
                        ApiError::Internal("Submission missing during AI grading".to_string())
                    })?;

            if locked.status != SubmissionStatus::Grading {
                return Err(ApiError::Conflict(
                    "Submission state changed while AI grading was running".to_string(),
                ));
            }

            for grade in &grades {
                let max_marks =
                    max_marks_by_question.get(grade.question_id.as_str()).copied().unwrap_or(0.0);
                let score = grading_policy::clamp_score(grade.score, max_marks);
                repositories::grades::upsert_ai(
                    &mut tx,
                    repositories::grades::AiGradeWrite {
                        id: &Uuid::new_v4().to_string(),
                        submission_id: &submission.id,
                        question_id: &grade.question_id,
                        score,
                        feedback: grade.feedback.as_deref(),
                        confidence: grade.confidence,
                        now,
                    },
                )
                .await
                .map_err(|e| ApiError::internal(e, "Failed to write AI grade"))?;
            }

            let scored_marks = repositories::grades::sum_final_scores(&mut tx, &submission.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to aggregate scores"))?;

            repositories::submissions::finalize_graded(&mut tx, &submission.id, scored_marks, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to finalize submission"))?;

            tx.commit()
                .await
                .map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

            tracing::info!(
                teacher_id = %teacher.id,
                submission_id = %submission.id,
                scored_marks,
                action = "ai_grade",
                "AI grading completed"
            );

            repositories::submissions::find_by_id(state.db(), &submission.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
                .ok_or_else(|| ApiError::Internal("Submission missing after grading".to_string()))?
        }
        Err(err) => {
            tracing::warn!(
                submission_id = %submission.id,
                error = %err,
                action = "ai_grade_error",
                "AI grading failed"
            );
            let message = format!("AI grading failed: {err}");
            repositories::submissions::mark_error(state.db(), &submission.id, &message, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to record grading error"))?;
            repositories::submissions::find_by_id(state.db(), &submission.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
                .ok_or_else(|| ApiError::Internal("Submission missing after grading".to_string()))?
        }
    };

    let response = helpers::build_submission_response(&state, updated).await?;
    Ok(Json(response))
}

/// Manual grade save. The submission row is locked for the whole request so
/// concurrent saves serialize; per-question writes, the recomputed aggregate
/// and the status flip commit atomically.
pub(super) async fn save_grades(
    Path(submission_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<SaveGradesRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (submission, exam) = helpers::fetch_submission_with_exam(&state, &submission_id).await?;

    if !helpers::is_exam_teacher(&teacher, &exam) {
        return Err(ApiError::Forbidden("You do not own this exam"));
    }

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;
    let questions_by_id: HashMap<&str, f64> =
        questions.iter().map(|question| (question.id.as_str(), question.max_marks)).collect();

    for item in &payload.grades {
        if !questions_by_id.contains_key(item.question_id.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Question {} does not belong to this exam",
                item.question_id
            )));
        }
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let locked = repositories::submissions::find_by_id_for_update(&mut tx, &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    if let Err(denied) = grading_policy::manual_grading_allowed(exam.grading_mode, locked.status) {
        return Err(ApiError::conflict("GradingInProgress", denied));
    }

    for item in &payload.grades {
        let max_marks = questions_by_id[item.question_id.as_str()];
        let score = grading_policy::clamp_score(item.score, max_marks);

        let ai_exists =
            repositories::grades::ai_score_exists(&mut tx, &submission.id, &item.question_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check existing AI score"))?;
        let method = grading_policy::method_for_manual_write(ai_exists);

        repositories::grades::upsert_manual(
            &mut tx,
            repositories::grades::ManualGradeWrite {
                id: &Uuid::new_v4().to_string(),
                submission_id: &submission.id,
                question_id: &item.question_id,
                score,
                feedback: item.feedback.as_deref(),
                method,
                graded_by: &teacher.id,
                now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to write grade"))?;
    }

    let scored_marks = repositories::grades::sum_final_scores(&mut tx, &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to aggregate scores"))?;

    repositories::submissions::finalize_graded(&mut tx, &submission.id, scored_marks, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to finalize submission"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        teacher_id = %teacher.id,
        submission_id = %submission.id,
        scored_marks,
        action = "grades_save",
        "Manual grades saved"
    );

    let updated = repositories::submissions::find_by_id(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::Internal("Submission missing after grading".to_string()))?;

    let response = helpers::build_submission_response(&state, updated).await?;
    Ok(Json(response))
}
