use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::TeachingSession;
use crate::db::types::SessionStatus;

const COLUMNS: &str = "\
    id, enrollment_id, status, start_photo_path, start_latitude, start_longitude, \
    end_photo_path, end_latitude, end_longitude, distance_from_school_m, \
    within_radius, verification_note, verified_by, verified_at, created_at, updated_at";

pub(crate) async fn create_pending(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    enrollment_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<TeachingSession, sqlx::Error> {
    sqlx::query_as::<_, TeachingSession>(&format!(
        "INSERT INTO teaching_sessions (id, enrollment_id, status, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$4)
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(enrollment_id)
    .bind(SessionStatus::Pending)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<TeachingSession>, sqlx::Error> {
    sqlx::query_as::<_, TeachingSession>(&format!(
        "SELECT {COLUMNS} FROM teaching_sessions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_enrollment(
    pool: &PgPool,
    enrollment_id: &str,
) -> Result<Option<TeachingSession>, sqlx::Error> {
    sqlx::query_as::<_, TeachingSession>(&format!(
        "SELECT {COLUMNS} FROM teaching_sessions WHERE enrollment_id = $1"
    ))
    .bind(enrollment_id)
    .fetch_optional(pool)
    .await
}

/// Cancellation side-effect: the session tied to a cancelled enrollment is
/// rejected within the same transaction.
pub(crate) async fn reject_for_enrollment(
    tx: &mut Transaction<'_, Postgres>,
    enrollment_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE teaching_sessions SET status = $1, updated_at = $2 WHERE enrollment_id = $3",
    )
    .bind(SessionStatus::Rejected)
    .bind(now)
    .bind(enrollment_id)
    .execute(&mut **tx)
    .await?;
    Ok(updated.rows_affected())
}

pub(crate) async fn reject_for_slot(
    tx: &mut Transaction<'_, Postgres>,
    slot_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE teaching_sessions SET status = $1, updated_at = $2
         WHERE enrollment_id IN (SELECT id FROM slot_enrollments WHERE slot_id = $3)",
    )
    .bind(SessionStatus::Rejected)
    .bind(now)
    .bind(slot_id)
    .execute(&mut **tx)
    .await?;
    Ok(updated.rows_affected())
}

pub(crate) struct StartPhotoUpdate<'a> {
    pub photo_path: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_from_school_m: f64,
    pub within_radius: bool,
    pub now: time::PrimitiveDateTime,
}

pub(crate) async fn record_start_photo(
    pool: &PgPool,
    id: &str,
    params: StartPhotoUpdate<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE teaching_sessions
         SET status = $1,
             start_photo_path = $2,
             start_latitude = $3,
             start_longitude = $4,
             distance_from_school_m = $5,
             within_radius = $6,
             updated_at = $7
         WHERE id = $8",
    )
    .bind(SessionStatus::PhotoSubmitted)
    .bind(params.photo_path)
    .bind(params.latitude)
    .bind(params.longitude)
    .bind(params.distance_from_school_m)
    .bind(params.within_radius)
    .bind(params.now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) struct EndPhotoUpdate<'a> {
    pub photo_path: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub now: time::PrimitiveDateTime,
}

pub(crate) async fn record_end_photo(
    pool: &PgPool,
    id: &str,
    params: EndPhotoUpdate<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE teaching_sessions
         SET end_photo_path = $1,
             end_latitude = $2,
             end_longitude = $3,
             updated_at = $4
         WHERE id = $5",
    )
    .bind(params.photo_path)
    .bind(params.latitude)
    .bind(params.longitude)
    .bind(params.now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn verify(
    pool: &PgPool,
    id: &str,
    status: SessionStatus,
    note: Option<String>,
    verified_by: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE teaching_sessions
         SET status = $1,
             verification_note = $2,
             verified_by = $3,
             verified_at = $4,
             updated_at = $4
         WHERE id = $5",
    )
    .bind(status)
    .bind(note)
    .bind(verified_by)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
