use sqlx::{PgPool, Postgres, Transaction};
use time::Date;

use crate::db::models::SlotEnrollment;
use crate::db::types::{EnrollmentStatus, SlotStatus};

const COLUMNS: &str = "\
    id, slot_id, teacher_id, status, cancellation_reason, cancelled_at, \
    booked_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<SlotEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, SlotEnrollment>(&format!(
        "SELECT {COLUMNS} FROM slot_enrollments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Row-locked fetch taken before any cancellation rule is evaluated, so a
/// concurrent cancel of the same enrollment waits and then re-reads the
/// updated status.
pub(crate) async fn find_by_id_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
) -> Result<Option<SlotEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, SlotEnrollment>(&format!(
        "SELECT {COLUMNS} FROM slot_enrollments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn is_booked_in_slot(
    tx: &mut Transaction<'_, Postgres>,
    slot_id: &str,
    teacher_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM slot_enrollments
         WHERE slot_id = $1 AND teacher_id = $2 AND status = $3",
    )
    .bind(slot_id)
    .bind(teacher_id)
    .bind(EnrollmentStatus::Booked)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(found.is_some())
}

/// Serializes booking attempts per teacher for the duration of the
/// transaction. The single-active-booking rule spans slots, so the slot row
/// lock alone cannot stop the same teacher booking two different slots at
/// once.
pub(crate) async fn lock_teacher_bookings(
    tx: &mut Transaction<'_, Postgres>,
    teacher_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(teacher_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// The global "at most one active booking" probe: a booked enrollment in any
/// school whose slot is upcoming and not completed/cancelled.
pub(crate) async fn has_active_booking(
    tx: &mut Transaction<'_, Postgres>,
    teacher_id: &str,
    today: Date,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM slot_enrollments e
         JOIN teaching_slots s ON s.id = e.slot_id
         WHERE e.teacher_id = $1
           AND e.status = $2
           AND s.status NOT IN ($3, $4)
           AND s.slot_date >= $5
         LIMIT 1",
    )
    .bind(teacher_id)
    .bind(EnrollmentStatus::Booked)
    .bind(SlotStatus::Completed)
    .bind(SlotStatus::Cancelled)
    .bind(today)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(found.is_some())
}

pub(crate) struct CreateEnrollment<'a> {
    pub id: &'a str,
    pub slot_id: &'a str,
    pub teacher_id: &'a str,
    pub booked_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    tx: &mut Transaction<'_, Postgres>,
    params: CreateEnrollment<'_>,
) -> Result<SlotEnrollment, sqlx::Error> {
    sqlx::query_as::<_, SlotEnrollment>(&format!(
        "INSERT INTO slot_enrollments (
            id, slot_id, teacher_id, status, booked_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$5)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.slot_id)
    .bind(params.teacher_id)
    .bind(EnrollmentStatus::Booked)
    .bind(params.booked_at)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn cancel(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    reason: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE slot_enrollments
         SET status = $1, cancellation_reason = $2, cancelled_at = $3, updated_at = $3
         WHERE id = $4",
    )
    .bind(EnrollmentStatus::Cancelled)
    .bind(reason)
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// When an admin closes out a slot, its live bookings are marked completed.
pub(crate) async fn complete_for_slot(
    tx: &mut Transaction<'_, Postgres>,
    slot_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE slot_enrollments SET status = $1, updated_at = $2
         WHERE slot_id = $3 AND status = $4",
    )
    .bind(EnrollmentStatus::Completed)
    .bind(now)
    .bind(slot_id)
    .bind(EnrollmentStatus::Booked)
    .execute(&mut **tx)
    .await?;
    Ok(updated.rows_affected())
}

/// Cancelling a whole slot releases every live booking in it.
pub(crate) async fn cancel_for_slot(
    tx: &mut Transaction<'_, Postgres>,
    slot_id: &str,
    reason: &str,
    now: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE slot_enrollments
         SET status = $1, cancellation_reason = $2, cancelled_at = $3, updated_at = $3
         WHERE slot_id = $4 AND status = $5",
    )
    .bind(EnrollmentStatus::Cancelled)
    .bind(reason)
    .bind(now)
    .bind(slot_id)
    .bind(EnrollmentStatus::Booked)
    .execute(&mut **tx)
    .await?;
    Ok(updated.rows_affected())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EnrollmentWithSlotRow {
    pub(crate) id: String,
    pub(crate) slot_id: String,
    pub(crate) teacher_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) cancellation_reason: Option<String>,
    pub(crate) cancelled_at: Option<time::PrimitiveDateTime>,
    pub(crate) booked_at: time::PrimitiveDateTime,
    pub(crate) school_id: String,
    pub(crate) school_name: String,
    pub(crate) slot_date: Date,
    pub(crate) start_time: time::Time,
    pub(crate) end_time: time::Time,
    pub(crate) slot_status: SlotStatus,
}

pub(crate) async fn list_by_teacher_with_slot(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<EnrollmentWithSlotRow>, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentWithSlotRow>(
        "SELECT e.id,
                e.slot_id,
                e.teacher_id,
                e.status,
                e.cancellation_reason,
                e.cancelled_at,
                e.booked_at,
                s.school_id,
                sc.name AS school_name,
                s.slot_date,
                s.start_time,
                s.end_time,
                s.status AS slot_status
         FROM slot_enrollments e
         JOIN teaching_slots s ON s.id = e.slot_id
         JOIN schools sc ON sc.id = s.school_id
         WHERE e.teacher_id = $1
         ORDER BY s.slot_date DESC, s.start_time DESC",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

/// Slot ids (among the given set) the teacher currently holds a booked row
/// in; used by the browse view to label per-slot eligibility.
pub(crate) async fn booked_slot_ids_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
    slot_ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    if slot_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar::<_, String>(
        "SELECT slot_id FROM slot_enrollments
         WHERE teacher_id = $1 AND status = $2 AND slot_id = ANY($3)",
    )
    .bind(teacher_id)
    .bind(EnrollmentStatus::Booked)
    .bind(slot_ids)
    .fetch_all(pool)
    .await
}

/// Pool-level variant of the active-booking probe for the browse view.
pub(crate) async fn has_active_booking_pool(
    pool: &PgPool,
    teacher_id: &str,
    today: Date,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM slot_enrollments e
         JOIN teaching_slots s ON s.id = e.slot_id
         WHERE e.teacher_id = $1
           AND e.status = $2
           AND s.status NOT IN ($3, $4)
           AND s.slot_date >= $5
         LIMIT 1",
    )
    .bind(teacher_id)
    .bind(EnrollmentStatus::Booked)
    .bind(SlotStatus::Completed)
    .bind(SlotStatus::Cancelled)
    .bind(today)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}
