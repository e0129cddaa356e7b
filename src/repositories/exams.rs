use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use time::Date;

use crate::db::models::ObjectiveExam;
use crate::db::types::{ExamStatus, GradingMode};

pub(crate) const COLUMNS: &str = "\
    id, school_id, teacher_id, title, description, grading_mode, total_marks, \
    passing_marks, exam_date, submission_deadline, duration_minutes, status, \
    created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ObjectiveExam>, sqlx::Error> {
    sqlx::query_as::<_, ObjectiveExam>(&format!(
        "SELECT {COLUMNS} FROM objective_exams WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<ObjectiveExam, sqlx::Error> {
    sqlx::query_as::<_, ObjectiveExam>(&format!(
        "SELECT {COLUMNS} FROM objective_exams WHERE id = $1"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateExam<'a> {
    pub id: &'a str,
    pub school_id: &'a str,
    pub teacher_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub grading_mode: GradingMode,
    pub total_marks: f64,
    pub passing_marks: f64,
    pub exam_date: Date,
    pub submission_deadline: time::PrimitiveDateTime,
    pub duration_minutes: i32,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    tx: &mut Transaction<'_, Postgres>,
    params: CreateExam<'_>,
) -> Result<ObjectiveExam, sqlx::Error> {
    sqlx::query_as::<_, ObjectiveExam>(&format!(
        "INSERT INTO objective_exams (
            id, school_id, teacher_id, title, description, grading_mode, total_marks,
            passing_marks, exam_date, submission_deadline, duration_minutes, status,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$13)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.teacher_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.grading_mode)
    .bind(params.total_marks)
    .bind(params.passing_marks)
    .bind(params.exam_date)
    .bind(params.submission_deadline)
    .bind(params.duration_minutes)
    .bind(ExamStatus::Draft)
    .bind(params.created_at)
    .fetch_one(&mut **tx)
    .await
}

/// grading_mode is write-once: no update path exists for it here.
pub(crate) struct UpdateExam {
    pub title: Option<String>,
    pub description: Option<String>,
    pub total_marks: Option<f64>,
    pub passing_marks: Option<f64>,
    pub exam_date: Option<Date>,
    pub submission_deadline: Option<time::PrimitiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateExam,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE objective_exams SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            total_marks = COALESCE($3, total_marks),
            passing_marks = COALESCE($4, passing_marks),
            exam_date = COALESCE($5, exam_date),
            submission_deadline = COALESCE($6, submission_deadline),
            duration_minutes = COALESCE($7, duration_minutes),
            updated_at = $8
         WHERE id = $9",
    )
    .bind(params.title)
    .bind(params.description)
    .bind(params.total_marks)
    .bind(params.passing_marks)
    .bind(params.exam_date)
    .bind(params.submission_deadline)
    .bind(params.duration_minutes)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM objective_exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}

pub(crate) async fn set_status(
    pool: &PgPool,
    id: &str,
    status: ExamStatus,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE objective_exams SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn count_questions(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM objective_questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn count_submissions(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM objective_submissions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_by_school(
    pool: &PgPool,
    school_id: &str,
    status: Option<ExamStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ObjectiveExam>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM objective_exams WHERE school_id = "
    ));
    builder.push_bind(school_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY exam_date DESC, created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ObjectiveExam>().fetch_all(pool).await
}

pub(crate) async fn count_by_school(
    pool: &PgPool,
    school_id: &str,
    status: Option<ExamStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM objective_exams WHERE school_id = ");
    builder.push_bind(school_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn list_by_teacher(
    pool: &PgPool,
    teacher_id: &str,
    status: Option<ExamStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ObjectiveExam>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM objective_exams WHERE teacher_id = "
    ));
    builder.push_bind(teacher_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY exam_date DESC, created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ObjectiveExam>().fetch_all(pool).await
}
