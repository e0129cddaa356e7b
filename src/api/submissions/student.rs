use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_image_upload;
use crate::core::state::AppState;
use crate::core::time::to_primitive_utc;
use crate::db::types::{ExamStatus, SubmissionStatus, UserRole};
use crate::repositories;
use crate::schemas::submission::{
    AnswerSheetResponse, StudentSubmissionResponse, SubmissionCreate, SubmissionResponse,
};
use crate::services::ocr::OcrService;

use super::helpers;

pub(super) async fn create_submission(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionCreate>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    if user.role != UserRole::Student {
        return Err(ApiError::Forbidden("Only students can submit exams"));
    }

    let exam = repositories::exams::find_by_id(state.db(), &payload.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;
    let Some(exam) = exam else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    if exam.status != ExamStatus::Active {
        return Err(ApiError::BadRequest("Exam is not open for submissions".to_string()));
    }

    let now = OffsetDateTime::now_utc();
    if exam.submission_deadline.assume_utc() < now {
        return Err(ApiError::BadRequest("Submission deadline has passed".to_string()));
    }

    let existing =
        repositories::submissions::find_for_exam_student(state.db(), &exam.id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check existing submission"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "You have already submitted for this exam".to_string(),
        ));
    }

    let submission = repositories::submissions::create(
        state.db(),
        repositories::submissions::CreateSubmission {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam.id,
            student_id: &user.id,
            submitted_at: to_primitive_utc(now),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create submission"))?;

    tracing::info!(
        student_id = %user.id,
        exam_id = %exam.id,
        submission_id = %submission.id,
        action = "submission_create",
        "Submission created"
    );

    let response = helpers::build_submission_response(&state, submission).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Multipart upload of one answer-sheet scan; pages are numbered in upload
/// order.
pub(super) async fn upload_sheet(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AnswerSheetResponse>), ApiError> {
    let (submission, exam) = helpers::fetch_submission_with_exam(&state, &submission_id).await?;

    if submission.student_id != user.id {
        return Err(ApiError::Forbidden("Access denied"));
    }

    if submission.status != SubmissionStatus::Pending {
        return Err(ApiError::conflict(
            "GradingInProgress",
            "answer sheets can only be uploaded before processing starts",
        ));
    }

    let sheet_count = repositories::submissions::sheet_count(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count answer sheets"))?;
    if sheet_count >= state.settings().storage().max_sheets_per_submission as i64 {
        return Err(ApiError::BadRequest("Too many answer sheets for this submission".to_string()));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
        .ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    let filename = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("File must have a filename".to_string()))?;
    let content_type = field
        .content_type()
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("File must have a content type".to_string()))?;

    validate_image_upload(
        &filename,
        &content_type,
        &state.settings().storage().allowed_image_extensions,
    )?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?
        .to_vec();

    let max_bytes = state.settings().storage().max_upload_size_mb * 1024 * 1024;
    if bytes.len() as u64 > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File exceeds the {} MB upload limit",
            state.settings().storage().max_upload_size_mb
        )));
    }

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("Object storage not configured".to_string()))?;

    let page_number = (sheet_count + 1) as i32;
    let key = format!("submissions/{}/{page_number}_{filename}", submission.id);
    let (file_size, sha256) = storage
        .upload_bytes(&key, &content_type, bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store answer sheet"))?;

    let now = crate::core::time::primitive_now_utc();
    let sheet = repositories::grades::create_sheet(
        state.db(),
        repositories::grades::CreateSheet {
            id: &Uuid::new_v4().to_string(),
            submission_id: &submission.id,
            filename: &filename,
            file_path: &key,
            file_size,
            mime_type: &content_type,
            sha256: &sha256,
            page_number,
            uploaded_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record answer sheet"))?;

    tracing::info!(
        student_id = %user.id,
        submission_id = %submission.id,
        exam_id = %exam.id,
        page_number,
        action = "sheet_upload",
        "Answer sheet uploaded"
    );

    Ok((StatusCode::CREATED, Json(AnswerSheetResponse::from_db(sheet))))
}

/// Runs the OCR collaborator over the uploaded sheets:
/// pending -> ocr_processing -> ocr_complete, or -> error with the
/// collaborator's message.
pub(super) async fn process_ocr(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let (submission, exam) = helpers::fetch_submission_with_exam(&state, &submission_id).await?;
    helpers::require_owner_or_teacher(&user, &submission, &exam)?;

    let sheets = repositories::grades::list_sheets(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answer sheets"))?;
    if sheets.is_empty() {
        return Err(ApiError::BadRequest(
            "Upload at least one answer sheet before processing".to_string(),
        ));
    }

    let now = crate::core::time::primitive_now_utc();
    let started = repositories::submissions::transition_status(
        state.db(),
        &submission.id,
        SubmissionStatus::Pending,
        SubmissionStatus::OcrProcessing,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to start OCR processing"))?;

    if !started {
        return Err(ApiError::conflict(
            "GradingInProgress",
            "submission has already been processed",
        ));
    }

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("Object storage not configured".to_string()))?;
    let ocr = OcrService::from_settings(state.settings())
        .map_err(|e| ApiError::internal(e, "Failed to build OCR client"))?;

    let mut pages = Vec::with_capacity(sheets.len());
    let mut confidence_sum = 0.0;
    let mut failure: Option<String> = None;

    for sheet in &sheets {
        let url = match storage
            .presign_get(&sheet.file_path, std::time::Duration::from_secs(300))
            .await
        {
            Ok(url) => url,
            Err(err) => {
                failure = Some(format!("failed to presign sheet {}: {err}", sheet.page_number));
                break;
            }
        };

        match ocr.extract_from_file_url(&url).await {
            Ok(extraction) => {
                confidence_sum += extraction.confidence;
                pages.push(format!("--- Page {} ---\n{}", sheet.page_number, extraction.text));
            }
            Err(err) => {
                failure = Some(format!("OCR failed on page {}: {err}", sheet.page_number));
                break;
            }
        }
    }

    let now = crate::core::time::primitive_now_utc();
    let updated = match failure {
        Some(message) => {
            tracing::warn!(
                submission_id = %submission.id,
                error = %message,
                action = "ocr_error",
                "OCR processing failed"
            );
            repositories::submissions::mark_error(state.db(), &submission.id, &message, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to record OCR error"))?;
            repositories::submissions::find_by_id(state.db(), &submission.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
                .ok_or_else(|| ApiError::Internal("Submission missing after OCR".to_string()))?
        }
        None => {
            let text = pages.join("\n\n");
            let confidence = confidence_sum / sheets.len() as f64;
            repositories::submissions::mark_ocr_complete(
                state.db(),
                &submission.id,
                &text,
                confidence,
                now,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to record OCR result"))?;
            repositories::submissions::find_by_id(state.db(), &submission.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
                .ok_or_else(|| ApiError::Internal("Submission missing after OCR".to_string()))?
        }
    };

    let response = helpers::build_submission_response(&state, updated).await?;
    Ok(Json(response))
}

pub(super) async fn my_submissions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentSubmissionResponse>>, ApiError> {
    let rows = repositories::submissions::list_by_student_with_exam(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(StudentSubmissionResponse::from_row).collect()))
}
