use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, Time};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{SlotEnrollment, TeachingSlot};
use crate::db::types::{EnrollmentStatus, SlotStatus};
use crate::repositories::slot_enrollments::EnrollmentWithSlotRow;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SlotCreate {
    #[serde(alias = "slotDate", deserialize_with = "deserialize_date")]
    pub(crate) slot_date: Date,
    #[serde(alias = "startTime", deserialize_with = "deserialize_time")]
    pub(crate) start_time: Time,
    #[serde(alias = "endTime", deserialize_with = "deserialize_time")]
    pub(crate) end_time: Time,
    #[serde(alias = "teachersRequired")]
    #[validate(range(min = 1, message = "teachers_required must be at least 1"))]
    pub(crate) teachers_required: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotCloseRequest {
    pub(crate) status: SlotStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CancelBookingRequest {
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub(crate) reason: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SlotResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) slot_date: String,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) teachers_required: i32,
    pub(crate) teachers_enrolled: i32,
    pub(crate) spots_left: i32,
    pub(crate) status: SlotStatus,
    pub(crate) created_at: String,
}

impl SlotResponse {
    pub(crate) fn from_db(slot: TeachingSlot) -> Self {
        let spots_left = (slot.teachers_required - slot.teachers_enrolled).max(0);
        Self {
            id: slot.id,
            school_id: slot.school_id,
            slot_date: format_date(slot.slot_date),
            start_time: format_time(slot.start_time),
            end_time: format_time(slot.end_time),
            teachers_required: slot.teachers_required,
            teachers_enrolled: slot.teachers_enrolled,
            spots_left,
            status: slot.status,
            created_at: format_primitive(slot.created_at),
        }
    }
}

/// Browse-view row: the slot plus the same eligibility verdict the booking
/// endpoint would return.
#[derive(Debug, Serialize)]
pub(crate) struct OpenSlotResponse {
    #[serde(flatten)]
    pub(crate) slot: SlotResponse,
    pub(crate) can_book: bool,
    pub(crate) deny_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BookingResponse {
    pub(crate) enrollment_id: String,
    pub(crate) slot_id: String,
    pub(crate) session_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) slot_status: SlotStatus,
    pub(crate) teachers_enrolled: i32,
    pub(crate) booked_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: String,
    pub(crate) slot_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) cancellation_reason: Option<String>,
    pub(crate) cancelled_at: Option<String>,
    pub(crate) booked_at: String,
}

impl EnrollmentResponse {
    pub(crate) fn from_db(enrollment: SlotEnrollment) -> Self {
        Self {
            id: enrollment.id,
            slot_id: enrollment.slot_id,
            status: enrollment.status,
            cancellation_reason: enrollment.cancellation_reason,
            cancelled_at: enrollment.cancelled_at.map(format_primitive),
            booked_at: format_primitive(enrollment.booked_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentHistoryResponse {
    pub(crate) id: String,
    pub(crate) slot_id: String,
    pub(crate) school_id: String,
    pub(crate) school_name: String,
    pub(crate) slot_date: String,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) slot_status: SlotStatus,
    pub(crate) status: EnrollmentStatus,
    pub(crate) cancellation_reason: Option<String>,
    pub(crate) cancelled_at: Option<String>,
    pub(crate) booked_at: String,
}

impl EnrollmentHistoryResponse {
    pub(crate) fn from_row(row: EnrollmentWithSlotRow) -> Self {
        Self {
            id: row.id,
            slot_id: row.slot_id,
            school_id: row.school_id,
            school_name: row.school_name,
            slot_date: format_date(row.slot_date),
            start_time: format_time(row.start_time),
            end_time: format_time(row.end_time),
            slot_status: row.slot_status,
            status: row.status,
            cancellation_reason: row.cancellation_reason,
            cancelled_at: row.cancelled_at.map(format_primitive),
            booked_at: format_primitive(row.booked_at),
        }
    }
}

pub(crate) fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

pub(crate) fn format_time(value: Time) -> String {
    value.format(&format_description!("[hour]:[minute]")).unwrap_or_else(|_| value.to_string())
}

fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw, &format_description!("[year]-[month]-[day]")).ok()
}

fn parse_time(raw: &str) -> Option<Time> {
    Time::parse(raw, &format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(raw, &format_description!("[hour]:[minute]:[second]")))
        .ok()
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
}

pub(crate) fn deserialize_time<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).ok_or_else(|| D::Error::custom(format!("invalid time: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    #[test]
    fn parse_date_accepts_iso_day() {
        assert_eq!(parse_date("2026-04-20"), Some(date!(2026 - 04 - 20)));
        assert_eq!(parse_date("20.04.2026"), None);
    }

    #[test]
    fn parse_time_accepts_minutes_and_seconds() {
        assert_eq!(parse_time("09:30"), Some(time!(09:30)));
        assert_eq!(parse_time("09:30:15"), Some(time!(09:30:15)));
        assert_eq!(parse_time("9h30"), None);
    }

    #[test]
    fn format_roundtrip() {
        assert_eq!(format_date(date!(2026 - 04 - 05)), "2026-04-05");
        assert_eq!(format_time(time!(14:05)), "14:05");
    }
}
