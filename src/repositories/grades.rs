use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::{AnswerGrade, AnswerSheet};
use crate::db::types::GradingMethod;

const COLUMNS: &str = "\
    id, submission_id, question_id, ai_score, ai_feedback, ai_confidence, \
    manual_score, manual_feedback, final_score, grading_method, graded_by, \
    graded_at, created_at, updated_at";

pub(crate) async fn list_by_submission(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Vec<AnswerGrade>, sqlx::Error> {
    sqlx::query_as::<_, AnswerGrade>(&format!(
        "SELECT {COLUMNS} FROM answer_grades g WHERE submission_id = $1
         ORDER BY (SELECT question_number FROM objective_questions q WHERE q.id = g.question_id)"
    ))
    .bind(submission_id)
    .fetch_all(pool)
    .await
}

/// Whether an AI score pre-exists for the pair; read inside the grade-save
/// transaction to decide manual vs ai_override provenance.
pub(crate) async fn ai_score_exists(
    tx: &mut Transaction<'_, Postgres>,
    submission_id: &str,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM answer_grades
         WHERE submission_id = $1 AND question_id = $2 AND ai_score IS NOT NULL",
    )
    .bind(submission_id)
    .bind(question_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(found.is_some())
}

pub(crate) struct ManualGradeWrite<'a> {
    pub id: &'a str,
    pub submission_id: &'a str,
    pub question_id: &'a str,
    pub score: f64,
    pub feedback: Option<&'a str>,
    pub method: GradingMethod,
    pub graded_by: &'a str,
    pub now: PrimitiveDateTime,
}

pub(crate) async fn upsert_manual(
    tx: &mut Transaction<'_, Postgres>,
    params: ManualGradeWrite<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO answer_grades (
            id, submission_id, question_id, manual_score, manual_feedback, final_score,
            grading_method, graded_by, graded_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$4,$6,$7,$8,$8,$8)
        ON CONFLICT (submission_id, question_id) DO UPDATE SET
            manual_score = EXCLUDED.manual_score,
            manual_feedback = EXCLUDED.manual_feedback,
            final_score = EXCLUDED.final_score,
            grading_method = EXCLUDED.grading_method,
            graded_by = EXCLUDED.graded_by,
            graded_at = EXCLUDED.graded_at,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.question_id)
    .bind(params.score)
    .bind(params.feedback)
    .bind(params.method)
    .bind(params.graded_by)
    .bind(params.now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub(crate) struct AiGradeWrite<'a> {
    pub id: &'a str,
    pub submission_id: &'a str,
    pub question_id: &'a str,
    pub score: f64,
    pub feedback: Option<&'a str>,
    pub confidence: Option<f64>,
    pub now: PrimitiveDateTime,
}

pub(crate) async fn upsert_ai(
    tx: &mut Transaction<'_, Postgres>,
    params: AiGradeWrite<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO answer_grades (
            id, submission_id, question_id, ai_score, ai_feedback, ai_confidence,
            final_score, grading_method, graded_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$4,$7,$8,$8,$8)
        ON CONFLICT (submission_id, question_id) DO UPDATE SET
            ai_score = EXCLUDED.ai_score,
            ai_feedback = EXCLUDED.ai_feedback,
            ai_confidence = EXCLUDED.ai_confidence,
            final_score = EXCLUDED.final_score,
            grading_method = EXCLUDED.grading_method,
            graded_at = EXCLUDED.graded_at,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.question_id)
    .bind(params.score)
    .bind(params.feedback)
    .bind(params.confidence)
    .bind(GradingMethod::Ai)
    .bind(params.now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub(crate) async fn sum_final_scores(
    tx: &mut Transaction<'_, Postgres>,
    submission_id: &str,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(final_score), 0) FROM answer_grades WHERE submission_id = $1",
    )
    .bind(submission_id)
    .fetch_one(&mut **tx)
    .await
}

const SHEET_COLUMNS: &str = "\
    id, submission_id, filename, file_path, file_size, mime_type, sha256, \
    page_number, uploaded_at";

pub(crate) struct CreateSheet<'a> {
    pub id: &'a str,
    pub submission_id: &'a str,
    pub filename: &'a str,
    pub file_path: &'a str,
    pub file_size: i64,
    pub mime_type: &'a str,
    pub sha256: &'a str,
    pub page_number: i32,
    pub uploaded_at: PrimitiveDateTime,
}

pub(crate) async fn create_sheet(
    pool: &PgPool,
    params: CreateSheet<'_>,
) -> Result<AnswerSheet, sqlx::Error> {
    sqlx::query_as::<_, AnswerSheet>(&format!(
        "INSERT INTO answer_sheets (
            id, submission_id, filename, file_path, file_size, mime_type, sha256,
            page_number, uploaded_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {SHEET_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.filename)
    .bind(params.file_path)
    .bind(params.file_size)
    .bind(params.mime_type)
    .bind(params.sha256)
    .bind(params.page_number)
    .bind(params.uploaded_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_sheets(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Vec<AnswerSheet>, sqlx::Error> {
    sqlx::query_as::<_, AnswerSheet>(&format!(
        "SELECT {SHEET_COLUMNS} FROM answer_sheets WHERE submission_id = $1 ORDER BY page_number"
    ))
    .bind(submission_id)
    .fetch_all(pool)
    .await
}
