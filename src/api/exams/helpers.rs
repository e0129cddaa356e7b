use time::{PrimitiveDateTime, Time};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::{ObjectiveExam, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::exam::ExamResponse;

/// Fetches the exam and verifies the caller owns it (admins pass).
pub(in crate::api::exams) async fn fetch_owned_exam(
    state: &AppState,
    user: &User,
    exam_id: &str,
) -> Result<ObjectiveExam, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    if exam.teacher_id != user.id && user.role != UserRole::Admin {
        return Err(ApiError::Forbidden("You do not own this exam"));
    }

    Ok(exam)
}

/// Builds the response; answer keys are stripped for anyone who is not the
/// owning teacher or an admin.
pub(in crate::api::exams) async fn exam_to_response(
    state: &AppState,
    exam: ObjectiveExam,
    include_answer_keys: bool,
) -> Result<ExamResponse, ApiError> {
    let mut questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    if !include_answer_keys {
        for question in &mut questions {
            question.answer_key_text = None;
        }
    }

    Ok(ExamResponse::from_db(exam, questions))
}

/// The source compared the deadline datetime against the exam date's
/// midnight, so a same-day evening deadline is valid.
pub(in crate::api::exams) fn validate_deadline_after_exam_date(
    exam_date: time::Date,
    submission_deadline: PrimitiveDateTime,
) -> Result<(), ApiError> {
    let exam_day_start = PrimitiveDateTime::new(exam_date, Time::MIDNIGHT);
    if submission_deadline <= exam_day_start {
        return Err(ApiError::BadRequest(
            "submission_deadline must be after exam_date".to_string(),
        ));
    }
    Ok(())
}

pub(in crate::api::exams) fn validate_marks(
    total_marks: f64,
    passing_marks: f64,
) -> Result<(), ApiError> {
    if passing_marks < 0.0 || passing_marks > total_marks {
        return Err(ApiError::BadRequest(
            "passing_marks must be between 0 and total_marks".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn deadline_must_be_after_exam_day_start() {
        assert!(validate_deadline_after_exam_date(
            date!(2026 - 05 - 01),
            datetime!(2026-05-01 18:00)
        )
        .is_ok());
        assert!(validate_deadline_after_exam_date(
            date!(2026 - 05 - 01),
            datetime!(2026-05-01 00:00)
        )
        .is_err());
        assert!(validate_deadline_after_exam_date(
            date!(2026 - 05 - 01),
            datetime!(2026-04-30 18:00)
        )
        .is_err());
    }

    #[test]
    fn marks_bounds() {
        assert!(validate_marks(100.0, 35.0).is_ok());
        assert!(validate_marks(100.0, 0.0).is_ok());
        assert!(validate_marks(100.0, 100.0).is_ok());
        assert!(validate_marks(100.0, 101.0).is_err());
        assert!(validate_marks(100.0, -1.0).is_err());
    }
}
