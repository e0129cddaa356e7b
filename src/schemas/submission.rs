use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{AnswerGrade, AnswerSheet, ObjectiveSubmission};
use crate::db::types::{GradingMethod, SubmissionStatus};
use crate::repositories::submissions::{SubmissionWithExamRow, SubmissionWithStudentRow};

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionCreate {
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct GradeItem {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    pub(crate) score: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveGradesRequest {
    #[validate(length(min = 1, message = "grades must not be empty"))]
    #[validate(nested)]
    pub(crate) grades: Vec<GradeItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerSheetResponse {
    pub(crate) id: String,
    pub(crate) filename: String,
    pub(crate) file_path: String,
    pub(crate) file_size: i64,
    pub(crate) mime_type: String,
    pub(crate) sha256: String,
    pub(crate) page_number: i32,
    pub(crate) uploaded_at: String,
}

impl AnswerSheetResponse {
    pub(crate) fn from_db(sheet: AnswerSheet) -> Self {
        Self {
            id: sheet.id,
            filename: sheet.filename,
            file_path: sheet.file_path,
            file_size: sheet.file_size,
            mime_type: sheet.mime_type,
            sha256: sheet.sha256,
            page_number: sheet.page_number,
            uploaded_at: format_primitive(sheet.uploaded_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerGradeResponse {
    pub(crate) question_id: String,
    pub(crate) ai_score: Option<f64>,
    pub(crate) ai_feedback: Option<String>,
    pub(crate) ai_confidence: Option<f64>,
    pub(crate) manual_score: Option<f64>,
    pub(crate) manual_feedback: Option<String>,
    pub(crate) final_score: f64,
    pub(crate) grading_method: GradingMethod,
    pub(crate) graded_by: Option<String>,
    pub(crate) graded_at: String,
}

impl AnswerGradeResponse {
    pub(crate) fn from_db(grade: AnswerGrade) -> Self {
        Self {
            question_id: grade.question_id,
            ai_score: grade.ai_score,
            ai_feedback: grade.ai_feedback,
            ai_confidence: grade.ai_confidence,
            manual_score: grade.manual_score,
            manual_feedback: grade.manual_feedback,
            final_score: grade.final_score,
            grading_method: grade.grading_method,
            graded_by: grade.graded_by,
            graded_at: format_primitive(grade.graded_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) ocr_text: Option<String>,
    pub(crate) ocr_confidence: Option<f64>,
    pub(crate) error_message: Option<String>,
    pub(crate) scored_marks: Option<f64>,
    pub(crate) submitted_at: String,
    pub(crate) graded_at: Option<String>,
    pub(crate) sheets: Vec<AnswerSheetResponse>,
    pub(crate) grades: Vec<AnswerGradeResponse>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(
        submission: ObjectiveSubmission,
        sheets: Vec<AnswerSheet>,
        grades: Vec<AnswerGrade>,
    ) -> Self {
        Self {
            id: submission.id,
            exam_id: submission.exam_id,
            student_id: submission.student_id,
            status: submission.status,
            ocr_text: submission.ocr_text,
            ocr_confidence: submission.ocr_confidence,
            error_message: submission.error_message,
            scored_marks: submission.scored_marks,
            submitted_at: format_primitive(submission.submitted_at),
            graded_at: submission.graded_at.map(format_primitive),
            sheets: sheets.into_iter().map(AnswerSheetResponse::from_db).collect(),
            grades: grades.into_iter().map(AnswerGradeResponse::from_db).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionSummaryResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_username: String,
    pub(crate) student_name: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) scored_marks: Option<f64>,
    pub(crate) submitted_at: String,
    pub(crate) graded_at: Option<String>,
}

impl SubmissionSummaryResponse {
    pub(crate) fn from_row(row: SubmissionWithStudentRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            student_username: row.student_username,
            student_name: row.student_name,
            status: row.status,
            scored_marks: row.scored_marks,
            submitted_at: format_primitive(row.submitted_at),
            graded_at: row.graded_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentSubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) status: SubmissionStatus,
    pub(crate) scored_marks: Option<f64>,
    pub(crate) passed: Option<bool>,
    pub(crate) submitted_at: String,
    pub(crate) graded_at: Option<String>,
}

impl StudentSubmissionResponse {
    pub(crate) fn from_row(row: SubmissionWithExamRow) -> Self {
        let passed = match (row.status, row.scored_marks) {
            (SubmissionStatus::Graded, Some(scored)) => Some(scored >= row.passing_marks),
            _ => None,
        };
        Self {
            id: row.id,
            exam_id: row.exam_id,
            exam_title: row.exam_title,
            total_marks: row.total_marks,
            passing_marks: row.passing_marks,
            status: row.status,
            scored_marks: row.scored_marks,
            passed,
            submitted_at: format_primitive(row.submitted_at),
            graded_at: row.graded_at.map(format_primitive),
        }
    }
}
