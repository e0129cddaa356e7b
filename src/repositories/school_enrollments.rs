use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::SchoolEnrollment;
use crate::db::types::SchoolEnrollmentStatus;

const COLUMNS: &str =
    "id, school_id, teacher_id, is_primary, status, enrolled_at, updated_at";

pub(crate) async fn find_for_teacher_school(
    pool: &PgPool,
    teacher_id: &str,
    school_id: &str,
) -> Result<Option<SchoolEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, SchoolEnrollment>(&format!(
        "SELECT {COLUMNS} FROM school_enrollments WHERE teacher_id = $1 AND school_id = $2"
    ))
    .bind(teacher_id)
    .bind(school_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<SchoolEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, SchoolEnrollment>(&format!(
        "SELECT {COLUMNS} FROM school_enrollments WHERE teacher_id = $1 ORDER BY enrolled_at"
    ))
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_school(
    pool: &PgPool,
    school_id: &str,
) -> Result<Vec<SchoolEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, SchoolEnrollment>(&format!(
        "SELECT {COLUMNS} FROM school_enrollments WHERE school_id = $1 ORDER BY enrolled_at"
    ))
    .bind(school_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateEnrollment<'a> {
    pub id: &'a str,
    pub school_id: &'a str,
    pub teacher_id: &'a str,
    pub is_primary: bool,
    pub status: SchoolEnrollmentStatus,
    pub enrolled_at: time::PrimitiveDateTime,
}

/// Inserts the enrollment; when `is_primary` is requested the teacher's
/// previous primary flag is cleared in the same transaction.
pub(crate) async fn create(
    tx: &mut Transaction<'_, Postgres>,
    params: CreateEnrollment<'_>,
) -> Result<SchoolEnrollment, sqlx::Error> {
    if params.is_primary {
        clear_primary(tx, params.teacher_id, params.enrolled_at).await?;
    }

    sqlx::query_as::<_, SchoolEnrollment>(&format!(
        "INSERT INTO school_enrollments (
            id, school_id, teacher_id, is_primary, status, enrolled_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.teacher_id)
    .bind(params.is_primary)
    .bind(params.status)
    .bind(params.enrolled_at)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn set_primary(
    tx: &mut Transaction<'_, Postgres>,
    teacher_id: &str,
    school_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    clear_primary(tx, teacher_id, now).await?;

    sqlx::query(
        "UPDATE school_enrollments SET is_primary = TRUE, updated_at = $1
         WHERE teacher_id = $2 AND school_id = $3",
    )
    .bind(now)
    .bind(teacher_id)
    .bind(school_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn clear_primary(
    tx: &mut Transaction<'_, Postgres>,
    teacher_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE school_enrollments SET is_primary = FALSE, updated_at = $1
         WHERE teacher_id = $2 AND is_primary",
    )
    .bind(now)
    .bind(teacher_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub(crate) async fn update_status(
    pool: &PgPool,
    teacher_id: &str,
    school_id: &str,
    status: SchoolEnrollmentStatus,
    now: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE school_enrollments SET status = $1, updated_at = $2
         WHERE teacher_id = $3 AND school_id = $4",
    )
    .bind(status)
    .bind(now)
    .bind(teacher_id)
    .bind(school_id)
    .execute(pool)
    .await?;
    Ok(updated.rows_affected() > 0)
}
