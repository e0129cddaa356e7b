use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::ObjectiveSubmission;
use crate::db::types::SubmissionStatus;

const COLUMNS: &str = "\
    id, exam_id, student_id, status, ocr_text, ocr_confidence, error_message, \
    scored_marks, submitted_at, graded_at, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ObjectiveSubmission>, sqlx::Error> {
    sqlx::query_as::<_, ObjectiveSubmission>(&format!(
        "SELECT {COLUMNS} FROM objective_submissions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Locked fetch taken at the start of every grade-writing transaction so
/// concurrent saves for the same submission serialize.
pub(crate) async fn find_by_id_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
) -> Result<Option<ObjectiveSubmission>, sqlx::Error> {
    sqlx::query_as::<_, ObjectiveSubmission>(&format!(
        "SELECT {COLUMNS} FROM objective_submissions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn find_for_exam_student(
    pool: &PgPool,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<ObjectiveSubmission>, sqlx::Error> {
    sqlx::query_as::<_, ObjectiveSubmission>(&format!(
        "SELECT {COLUMNS} FROM objective_submissions WHERE exam_id = $1 AND student_id = $2"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateSubmission<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub student_id: &'a str,
    pub submitted_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubmission<'_>,
) -> Result<ObjectiveSubmission, sqlx::Error> {
    sqlx::query_as::<_, ObjectiveSubmission>(&format!(
        "INSERT INTO objective_submissions (
            id, exam_id, student_id, status, submitted_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$5,$5)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.student_id)
    .bind(SubmissionStatus::Pending)
    .bind(params.submitted_at)
    .fetch_one(pool)
    .await
}

/// Guarded status move: only applies when the row is still in `from`.
/// Returns false when another request moved it first.
pub(crate) async fn transition_status(
    pool: &PgPool,
    id: &str,
    from: SubmissionStatus,
    to: SubmissionStatus,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE objective_submissions SET status = $1, updated_at = $2
         WHERE id = $3 AND status = $4",
    )
    .bind(to)
    .bind(now)
    .bind(id)
    .bind(from)
    .execute(pool)
    .await?;
    Ok(updated.rows_affected() > 0)
}

pub(crate) async fn mark_ocr_complete(
    pool: &PgPool,
    id: &str,
    ocr_text: &str,
    ocr_confidence: f64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE objective_submissions
         SET status = $1, ocr_text = $2, ocr_confidence = $3, error_message = NULL,
             updated_at = $4
         WHERE id = $5",
    )
    .bind(SubmissionStatus::OcrComplete)
    .bind(ocr_text)
    .bind(ocr_confidence)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// `error` is reachable from every state except the terminal `graded`.
pub(crate) async fn mark_error(
    pool: &PgPool,
    id: &str,
    message: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE objective_submissions
         SET status = $1, error_message = $2, updated_at = $3
         WHERE id = $4 AND status <> $5",
    )
    .bind(SubmissionStatus::Error)
    .bind(message)
    .bind(now)
    .bind(id)
    .bind(SubmissionStatus::Graded)
    .execute(pool)
    .await?;
    Ok(updated.rows_affected() > 0)
}

/// Flips the aggregate and the terminal status together; always called with
/// the per-question grade writes in the same transaction.
pub(crate) async fn finalize_graded(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    scored_marks: f64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE objective_submissions
         SET status = $1, scored_marks = $2, error_message = NULL, graded_at = $3,
             updated_at = $3
         WHERE id = $4",
    )
    .bind(SubmissionStatus::Graded)
    .bind(scored_marks)
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubmissionWithStudentRow {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_username: String,
    pub(crate) student_name: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) scored_marks: Option<f64>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
    status: Option<SubmissionStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<SubmissionWithStudentRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT s.id,
                s.student_id,
                u.username AS student_username,
                u.full_name AS student_name,
                s.status,
                s.scored_marks,
                s.submitted_at,
                s.graded_at
         FROM objective_submissions s
         JOIN users u ON u.id = s.student_id
         WHERE s.exam_id = ",
    );
    builder.push_bind(exam_id);

    if let Some(status) = status {
        builder.push(" AND s.status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY s.submitted_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<SubmissionWithStudentRow>().fetch_all(pool).await
}

pub(crate) async fn count_by_exam(
    pool: &PgPool,
    exam_id: &str,
    status: Option<SubmissionStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM objective_submissions WHERE exam_id = ",
    );
    builder.push_bind(exam_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubmissionWithExamRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) status: SubmissionStatus,
    pub(crate) scored_marks: Option<f64>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
}

pub(crate) async fn list_by_student_with_exam(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<SubmissionWithExamRow>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionWithExamRow>(
        "SELECT s.id,
                s.exam_id,
                e.title AS exam_title,
                e.total_marks,
                e.passing_marks,
                s.status,
                s.scored_marks,
                s.submitted_at,
                s.graded_at
         FROM objective_submissions s
         JOIN objective_exams e ON e.id = s.exam_id
         WHERE s.student_id = $1
         ORDER BY s.submitted_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn sheet_count(pool: &PgPool, submission_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM answer_sheets WHERE submission_id = $1")
        .bind(submission_id)
        .fetch_one(pool)
        .await
}
