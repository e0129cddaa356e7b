use serde_json::json;
use time::macros::datetime;
use validator::Validate;

use crate::db::types::SubmissionStatus;
use crate::repositories::submissions::SubmissionWithExamRow;
use crate::schemas::submission::{SaveGradesRequest, StudentSubmissionResponse, SubmissionCreate};

#[test]
fn save_grades_requires_at_least_one_entry() {
    let payload: SaveGradesRequest =
        serde_json::from_value(json!({ "grades": [] })).expect("deserialize");
    assert!(payload.validate().is_err());
}

#[test]
fn save_grades_accepts_camel_case_question_ids() {
    let payload: SaveGradesRequest = serde_json::from_value(json!({
        "grades": [
            {"questionId": "q-1", "score": 4.5, "feedback": "solid"},
            {"question_id": "q-2", "score": 0.0}
        ]
    }))
    .expect("deserialize");
    assert!(payload.validate().is_ok());
    assert_eq!(payload.grades[0].question_id, "q-1");
    assert_eq!(payload.grades[1].question_id, "q-2");
    assert!(payload.grades[1].feedback.is_none());
}

#[test]
fn submission_create_accepts_exam_id_alias() {
    let payload: SubmissionCreate =
        serde_json::from_value(json!({ "examId": "exam-7" })).expect("deserialize");
    assert_eq!(payload.exam_id, "exam-7");
}

fn exam_row(status: SubmissionStatus, scored_marks: Option<f64>) -> SubmissionWithExamRow {
    SubmissionWithExamRow {
        id: "sub-1".to_string(),
        exam_id: "exam-1".to_string(),
        exam_title: "Science midterm".to_string(),
        total_marks: 50.0,
        passing_marks: 17.5,
        status,
        scored_marks,
        submitted_at: datetime!(2026-05-01 10:00),
        graded_at: None,
    }
}

#[test]
fn pass_verdict_only_for_graded_submissions() {
    let graded = StudentSubmissionResponse::from_row(exam_row(
        SubmissionStatus::Graded,
        Some(20.0),
    ));
    assert_eq!(graded.passed, Some(true));

    let failed = StudentSubmissionResponse::from_row(exam_row(
        SubmissionStatus::Graded,
        Some(10.0),
    ));
    assert_eq!(failed.passed, Some(false));

    let in_flight = StudentSubmissionResponse::from_row(exam_row(
        SubmissionStatus::OcrProcessing,
        None,
    ));
    assert_eq!(in_flight.passed, None);
}
