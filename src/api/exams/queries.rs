use serde::Deserialize;

use crate::api::pagination::default_limit;
use crate::db::types::{ExamStatus, SubmissionStatus};

#[derive(Debug, Deserialize)]
pub(in crate::api::exams) struct ListExamsQuery {
    #[serde(default)]
    pub(in crate::api::exams) status: Option<ExamStatus>,
    #[serde(default)]
    pub(in crate::api::exams) skip: i64,
    #[serde(default = "default_limit")]
    pub(in crate::api::exams) limit: i64,
}

#[derive(Debug, Deserialize)]
pub(in crate::api::exams) struct ListSubmissionsQuery {
    #[serde(default)]
    pub(in crate::api::exams) status: Option<SubmissionStatus>,
    #[serde(default)]
    pub(in crate::api::exams) skip: i64,
    #[serde(default = "default_limit")]
    pub(in crate::api::exams) limit: i64,
}

#[derive(Debug, Deserialize)]
pub(in crate::api::exams) struct DeleteExamQuery {
    #[serde(default)]
    pub(in crate::api::exams) force_delete: bool,
}
