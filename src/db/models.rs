use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime, Time};

use crate::db::types::{
    EnrollmentStatus, ExamStatus, GradingMethod, GradingMode, SchoolEnrollmentStatus, SchoolStatus,
    SessionStatus, SlotStatus, SubmissionStatus, UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct School {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) address: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) allowed_radius_m: f64,
    pub(crate) status: SchoolStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SchoolEnrollment {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) teacher_id: String,
    pub(crate) is_primary: bool,
    pub(crate) status: SchoolEnrollmentStatus,
    pub(crate) enrolled_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TeachingSlot {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) slot_date: Date,
    pub(crate) start_time: Time,
    pub(crate) end_time: Time,
    pub(crate) teachers_required: i32,
    pub(crate) teachers_enrolled: i32,
    pub(crate) status: SlotStatus,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SlotEnrollment {
    pub(crate) id: String,
    pub(crate) slot_id: String,
    pub(crate) teacher_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) cancellation_reason: Option<String>,
    pub(crate) cancelled_at: Option<PrimitiveDateTime>,
    pub(crate) booked_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TeachingSession {
    pub(crate) id: String,
    pub(crate) enrollment_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) start_photo_path: Option<String>,
    pub(crate) start_latitude: Option<f64>,
    pub(crate) start_longitude: Option<f64>,
    pub(crate) end_photo_path: Option<String>,
    pub(crate) end_latitude: Option<f64>,
    pub(crate) end_longitude: Option<f64>,
    pub(crate) distance_from_school_m: Option<f64>,
    pub(crate) within_radius: Option<bool>,
    pub(crate) verification_note: Option<String>,
    pub(crate) verified_by: Option<String>,
    pub(crate) verified_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ObjectiveExam {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) teacher_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) grading_mode: GradingMode,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) exam_date: Date,
    pub(crate) submission_deadline: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) status: ExamStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ObjectiveQuestion {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_number: i32,
    pub(crate) question_text: String,
    pub(crate) max_marks: f64,
    pub(crate) answer_key_text: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ObjectiveSubmission {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) ocr_text: Option<String>,
    pub(crate) ocr_confidence: Option<f64>,
    pub(crate) error_message: Option<String>,
    pub(crate) scored_marks: Option<f64>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AnswerSheet {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) filename: String,
    pub(crate) file_path: String,
    pub(crate) file_size: i64,
    pub(crate) mime_type: String,
    pub(crate) sha256: String,
    pub(crate) page_number: i32,
    pub(crate) uploaded_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AnswerGrade {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) question_id: String,
    pub(crate) ai_score: Option<f64>,
    pub(crate) ai_feedback: Option<String>,
    pub(crate) ai_confidence: Option<f64>,
    pub(crate) manual_score: Option<f64>,
    pub(crate) manual_feedback: Option<String>,
    pub(crate) final_score: f64,
    pub(crate) grading_method: GradingMethod,
    pub(crate) graded_by: Option<String>,
    pub(crate) graded_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
