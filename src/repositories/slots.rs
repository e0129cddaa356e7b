use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use time::Date;

use crate::db::models::TeachingSlot;
use crate::db::types::{EnrollmentStatus, SlotStatus};
use crate::services::booking_policy;

const COLUMNS: &str = "\
    id, school_id, slot_date, start_time, end_time, teachers_required, \
    teachers_enrolled, status, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<TeachingSlot>, sqlx::Error> {
    sqlx::query_as::<_, TeachingSlot>(&format!(
        "SELECT {COLUMNS} FROM teaching_slots WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Row-locked fetch used by the booking and cancellation transactions; the
/// lock serializes concurrent capacity checks on the same slot.
pub(crate) async fn find_by_id_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
) -> Result<Option<TeachingSlot>, sqlx::Error> {
    sqlx::query_as::<_, TeachingSlot>(&format!(
        "SELECT {COLUMNS} FROM teaching_slots WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) struct CreateSlot<'a> {
    pub id: &'a str,
    pub school_id: &'a str,
    pub slot_date: Date,
    pub start_time: time::Time,
    pub end_time: time::Time,
    pub teachers_required: i32,
    pub created_by: &'a str,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSlot<'_>,
) -> Result<TeachingSlot, sqlx::Error> {
    sqlx::query_as::<_, TeachingSlot>(&format!(
        "INSERT INTO teaching_slots (
            id, school_id, slot_date, start_time, end_time, teachers_required,
            teachers_enrolled, status, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,0,$7,$8,$9,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.slot_date)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.teachers_required)
    .bind(SlotStatus::Open)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_by_school(
    pool: &PgPool,
    school_id: &str,
    status: Option<SlotStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<TeachingSlot>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM teaching_slots WHERE school_id = "
    ));
    builder.push_bind(school_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY slot_date, start_time OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<TeachingSlot>().fetch_all(pool).await
}

pub(crate) async fn count_by_school(
    pool: &PgPool,
    school_id: &str,
    status: Option<SlotStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM teaching_slots WHERE school_id = ");
    builder.push_bind(school_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Bookable slots for the browse view: upcoming, not completed/cancelled.
pub(crate) async fn list_open_upcoming(
    pool: &PgPool,
    today: Date,
    skip: i64,
    limit: i64,
) -> Result<Vec<TeachingSlot>, sqlx::Error> {
    sqlx::query_as::<_, TeachingSlot>(&format!(
        "SELECT {COLUMNS} FROM teaching_slots
         WHERE slot_date >= $1 AND status NOT IN ($2, $3)
         ORDER BY slot_date, start_time
         OFFSET $4 LIMIT $5",
    ))
    .bind(today)
    .bind(SlotStatus::Completed)
    .bind(SlotStatus::Cancelled)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn set_terminal_status(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    status: SlotStatus,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE teaching_slots SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Recounts booked enrollments and re-derives the slot status inside the
/// caller's transaction. The slot row must already be locked. Terminal
/// statuses are preserved; only the counter is refreshed for them.
pub(crate) async fn recount_capacity(
    tx: &mut Transaction<'_, Postgres>,
    slot: &TeachingSlot,
    now: time::PrimitiveDateTime,
) -> Result<(i32, SlotStatus), sqlx::Error> {
    let enrolled: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM slot_enrollments WHERE slot_id = $1 AND status = $2",
    )
    .bind(&slot.id)
    .bind(EnrollmentStatus::Booked)
    .fetch_one(&mut **tx)
    .await?;

    let enrolled = enrolled as i32;
    let status = if matches!(slot.status, SlotStatus::Completed | SlotStatus::Cancelled) {
        slot.status
    } else {
        booking_policy::derive_slot_status(enrolled, slot.teachers_required)
    };

    sqlx::query(
        "UPDATE teaching_slots SET teachers_enrolled = $1, status = $2, updated_at = $3
         WHERE id = $4",
    )
    .bind(enrolled)
    .bind(status)
    .bind(now)
    .bind(&slot.id)
    .execute(&mut **tx)
    .await?;

    Ok((enrolled, status))
}
