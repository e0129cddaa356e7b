use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{ObjectiveExam, ObjectiveQuestion};
use crate::db::types::{ExamStatus, GradingMode};
use crate::schemas::slot::{deserialize_date, format_date};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(alias = "maxMarks")]
    #[validate(range(exclusive_min = 0.0, message = "max_marks must be positive"))]
    pub(crate) max_marks: f64,
    #[serde(default)]
    #[serde(alias = "answerKeyText")]
    pub(crate) answer_key_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_number: i32,
    pub(crate) question_text: String,
    pub(crate) max_marks: f64,
    pub(crate) answer_key_text: Option<String>,
    pub(crate) created_at: String,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: ObjectiveQuestion) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            question_number: question.question_number,
            question_text: question.question_text,
            max_marks: question.max_marks,
            answer_key_text: question.answer_key_text,
            created_at: format_primitive(question.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "gradingMode")]
    pub(crate) grading_mode: GradingMode,
    #[serde(alias = "totalMarks")]
    #[validate(range(exclusive_min = 0.0, message = "total_marks must be positive"))]
    pub(crate) total_marks: f64,
    #[serde(alias = "passingMarks")]
    #[validate(range(min = 0.0, message = "passing_marks must be non-negative"))]
    pub(crate) passing_marks: f64,
    #[serde(alias = "examDate", deserialize_with = "deserialize_date")]
    pub(crate) exam_date: Date,
    #[serde(
        alias = "submissionDeadline",
        deserialize_with = "deserialize_offset_datetime_flexible"
    )]
    pub(crate) submission_deadline: OffsetDateTime,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

/// grading_mode is intentionally absent: it is fixed at creation.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "totalMarks")]
    #[validate(range(exclusive_min = 0.0, message = "total_marks must be positive"))]
    pub(crate) total_marks: Option<f64>,
    #[serde(default)]
    #[serde(alias = "passingMarks")]
    #[validate(range(min = 0.0, message = "passing_marks must be non-negative"))]
    pub(crate) passing_marks: Option<f64>,
    #[serde(default, alias = "examDate", deserialize_with = "deserialize_option_date")]
    pub(crate) exam_date: Option<Date>,
    #[serde(
        default,
        alias = "submissionDeadline",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) submission_deadline: Option<OffsetDateTime>,
    #[serde(default)]
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) teacher_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) grading_mode: GradingMode,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) exam_date: String,
    pub(crate) submission_deadline: String,
    pub(crate) duration_minutes: i32,
    pub(crate) status: ExamStatus,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: ObjectiveExam, questions: Vec<ObjectiveQuestion>) -> Self {
        Self {
            id: exam.id,
            school_id: exam.school_id,
            teacher_id: exam.teacher_id,
            title: exam.title,
            description: exam.description,
            grading_mode: exam.grading_mode,
            total_marks: exam.total_marks,
            passing_marks: exam.passing_marks,
            exam_date: format_date(exam.exam_date),
            submission_deadline: format_primitive(exam.submission_deadline),
            duration_minutes: exam.duration_minutes,
            status: exam.status,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) title: String,
    pub(crate) grading_mode: GradingMode,
    pub(crate) total_marks: f64,
    pub(crate) exam_date: String,
    pub(crate) submission_deadline: String,
    pub(crate) status: ExamStatus,
}

impl ExamSummaryResponse {
    pub(crate) fn from_db(exam: ObjectiveExam) -> Self {
        Self {
            id: exam.id,
            school_id: exam.school_id,
            title: exam.title,
            grading_mode: exam.grading_mode,
            total_marks: exam.total_marks,
            exam_date: format_date(exam.exam_date),
            submission_deadline: format_primitive(exam.submission_deadline),
            status: exam.status,
        }
    }
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // datetime-local inputs often arrive without a timezone.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

fn deserialize_option_date<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => {
            Date::parse(&value, &format_description!("[year]-[month]-[day]"))
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid date: {value}")))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_datetime_accepts_rfc3339() {
        let parsed = parse_offset_datetime_flexible("2026-05-01T10:00:00Z").expect("parsed");
        assert_eq!(parsed.unix_timestamp(), 1_777_629_600);
    }

    #[test]
    fn flexible_datetime_accepts_datetime_local() {
        assert!(parse_offset_datetime_flexible("2026-05-01T10:00").is_some());
        assert!(parse_offset_datetime_flexible("2026-05-01T10:00:30").is_some());
    }

    #[test]
    fn flexible_datetime_rejects_garbage() {
        assert!(parse_offset_datetime_flexible("next friday").is_none());
    }
}
