//! Eligibility rules for booking and cancelling teaching slots.
//!
//! The handlers fetch row snapshots under `FOR UPDATE` locks and call into
//! these functions; every rule evaluated here is therefore decided against
//! the same state the transaction will write.

use thiserror::Error;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

use crate::db::types::{EnrollmentStatus, SlotStatus};

/// Cancellations are rejected once the slot starts in less than this many
/// hours. Only enforced while the slot has not started yet.
pub(crate) const CANCELLATION_DEADLINE_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotSnapshot {
    pub(crate) status: SlotStatus,
    pub(crate) slot_date: Date,
    pub(crate) start_time: Time,
    pub(crate) teachers_required: i32,
    pub(crate) teachers_enrolled: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TeacherBookingContext {
    /// The teacher already holds a booked row in this very slot.
    pub(crate) booked_in_this_slot: bool,
    /// The teacher holds a booked enrollment in any slot dated today or later
    /// whose slot is not completed/cancelled. Checked across all schools.
    pub(crate) has_active_booking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum BookingDenied {
    #[error("this slot is no longer open for booking")]
    SlotUnavailable,
    #[error("all teaching spots in this slot are taken")]
    SlotFull,
    #[error("you are already booked into this slot")]
    AlreadyBookedThisSlot,
    #[error("you already hold an active slot booking")]
    ActiveBookingExists,
}

impl BookingDenied {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Self::SlotUnavailable => "SlotUnavailable",
            Self::SlotFull => "SlotFull",
            Self::AlreadyBookedThisSlot => "AlreadyBookedThisSlot",
            Self::ActiveBookingExists => "ActiveBookingExists",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum CancellationDenied {
    #[error("this booking is not active")]
    AlreadyCancelled,
    #[error("past bookings cannot be cancelled")]
    PastBooking,
    #[error("bookings cannot be cancelled less than {CANCELLATION_DEADLINE_HOURS} hours before the slot starts")]
    WithinCancellationWindow,
}

impl CancellationDenied {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Self::AlreadyCancelled => "AlreadyCancelled",
            Self::PastBooking => "PastBooking",
            Self::WithinCancellationWindow => "WithinCancellationWindow",
        }
    }
}

pub(crate) fn spots_left(slot: &SlotSnapshot) -> i32 {
    (slot.teachers_required - slot.teachers_enrolled).max(0)
}

/// The gating evaluated by both the browse view and the booking endpoint.
pub(crate) fn evaluate_booking(
    slot: &SlotSnapshot,
    teacher: &TeacherBookingContext,
) -> Result<(), BookingDenied> {
    if matches!(slot.status, SlotStatus::Completed | SlotStatus::Cancelled) {
        return Err(BookingDenied::SlotUnavailable);
    }
    if spots_left(slot) == 0 {
        return Err(BookingDenied::SlotFull);
    }
    if teacher.booked_in_this_slot {
        return Err(BookingDenied::AlreadyBookedThisSlot);
    }
    if teacher.has_active_booking {
        return Err(BookingDenied::ActiveBookingExists);
    }
    Ok(())
}

/// Rules for the booked -> cancelled transition. Ownership is checked by the
/// caller before this runs.
pub(crate) fn evaluate_cancellation(
    enrollment_status: EnrollmentStatus,
    slot_date: Date,
    slot_start: Time,
    now: OffsetDateTime,
) -> Result<(), CancellationDenied> {
    if enrollment_status != EnrollmentStatus::Booked {
        return Err(CancellationDenied::AlreadyCancelled);
    }
    if slot_date < now.date() {
        return Err(CancellationDenied::PastBooking);
    }

    let start = PrimitiveDateTime::new(slot_date, slot_start).assume_utc();
    let until_start = start - now;
    if until_start > Duration::ZERO && until_start < Duration::hours(CANCELLATION_DEADLINE_HOURS) {
        return Err(CancellationDenied::WithinCancellationWindow);
    }

    Ok(())
}

/// Capacity-derived slot status, recomputed inside the same transaction as
/// every enrollment write. Terminal statuses are never derived here.
pub(crate) fn derive_slot_status(enrolled: i32, required: i32) -> SlotStatus {
    if enrolled <= 0 {
        SlotStatus::Open
    } else if enrolled < required {
        SlotStatus::PartiallyFilled
    } else {
        SlotStatus::Full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    fn open_slot(enrolled: i32, required: i32) -> SlotSnapshot {
        SlotSnapshot {
            status: derive_slot_status(enrolled, required),
            slot_date: date!(2026 - 04 - 20),
            start_time: time!(09:00),
            teachers_required: required,
            teachers_enrolled: enrolled,
        }
    }

    #[test]
    fn booking_succeeds_for_free_teacher_and_open_slot() {
        let slot = open_slot(1, 2);
        let teacher = TeacherBookingContext::default();
        assert!(evaluate_booking(&slot, &teacher).is_ok());
    }

    #[test]
    fn booking_last_spot_flips_status_to_full() {
        // Scenario: required=2, enrolled=1 -> booking succeeds and the
        // derived status for enrolled=2 is full.
        let slot = open_slot(1, 2);
        assert_eq!(slot.status, SlotStatus::PartiallyFilled);
        assert!(evaluate_booking(&slot, &TeacherBookingContext::default()).is_ok());
        assert_eq!(derive_slot_status(2, 2), SlotStatus::Full);
    }

    #[test]
    fn booking_full_slot_is_rejected() {
        let slot = open_slot(2, 2);
        let err = evaluate_booking(&slot, &TeacherBookingContext::default()).unwrap_err();
        assert_eq!(err, BookingDenied::SlotFull);
        assert_eq!(err.code(), "SlotFull");
    }

    #[test]
    fn booking_completed_or_cancelled_slot_is_rejected() {
        for status in [SlotStatus::Completed, SlotStatus::Cancelled] {
            let mut slot = open_slot(0, 2);
            slot.status = status;
            assert_eq!(
                evaluate_booking(&slot, &TeacherBookingContext::default()),
                Err(BookingDenied::SlotUnavailable)
            );
        }
    }

    #[test]
    fn teacher_with_active_booking_anywhere_is_rejected() {
        let slot = open_slot(0, 2);
        let teacher =
            TeacherBookingContext { booked_in_this_slot: false, has_active_booking: true };
        assert_eq!(
            evaluate_booking(&slot, &teacher),
            Err(BookingDenied::ActiveBookingExists)
        );
    }

    #[test]
    fn teacher_already_in_this_slot_gets_specific_error() {
        let slot = open_slot(1, 2);
        let teacher = TeacherBookingContext { booked_in_this_slot: true, has_active_booking: true };
        assert_eq!(
            evaluate_booking(&slot, &teacher),
            Err(BookingDenied::AlreadyBookedThisSlot)
        );
    }

    #[test]
    fn spots_left_never_negative() {
        let mut slot = open_slot(3, 2);
        slot.status = SlotStatus::Full;
        assert_eq!(spots_left(&slot), 0);
    }

    #[test]
    fn cancellation_requires_booked_status() {
        let now = datetime!(2026-04-10 12:00 UTC);
        for status in
            [EnrollmentStatus::Cancelled, EnrollmentStatus::Completed, EnrollmentStatus::NoShow]
        {
            assert_eq!(
                evaluate_cancellation(status, date!(2026 - 04 - 20), time!(09:00), now),
                Err(CancellationDenied::AlreadyCancelled)
            );
        }
    }

    #[test]
    fn cancellation_of_past_slot_is_rejected() {
        let now = datetime!(2026-04-10 12:00 UTC);
        assert_eq!(
            evaluate_cancellation(EnrollmentStatus::Booked, date!(2026 - 04 - 09), time!(09:00), now),
            Err(CancellationDenied::PastBooking)
        );
    }

    #[test]
    fn cancellation_inside_24h_window_is_rejected() {
        // Slot starts 2026-04-11 09:00, now 2026-04-10 12:00 -> 21h ahead.
        let now = datetime!(2026-04-10 12:00 UTC);
        assert_eq!(
            evaluate_cancellation(EnrollmentStatus::Booked, date!(2026 - 04 - 11), time!(09:00), now),
            Err(CancellationDenied::WithinCancellationWindow)
        );
    }

    #[test]
    fn cancellation_exactly_at_deadline_is_allowed() {
        // 24h before the start is not strictly inside the window.
        let now = datetime!(2026-04-10 09:00 UTC);
        assert!(evaluate_cancellation(
            EnrollmentStatus::Booked,
            date!(2026 - 04 - 11),
            time!(09:00),
            now
        )
        .is_ok());
    }

    #[test]
    fn cancellation_more_than_24h_ahead_is_allowed() {
        let now = datetime!(2026-04-10 08:59 UTC);
        assert!(evaluate_cancellation(
            EnrollmentStatus::Booked,
            date!(2026 - 04 - 12),
            time!(09:00),
            now
        )
        .is_ok());
    }

    #[test]
    fn cancellation_after_slot_started_today_is_allowed() {
        // The window rule only applies while the start is still ahead;
        // a same-day slot that already started falls through to success.
        let now = datetime!(2026-04-10 10:00 UTC);
        assert!(evaluate_cancellation(
            EnrollmentStatus::Booked,
            date!(2026 - 04 - 10),
            time!(09:00),
            now
        )
        .is_ok());
    }

    #[test]
    fn derive_slot_status_covers_all_ratios() {
        assert_eq!(derive_slot_status(0, 3), SlotStatus::Open);
        assert_eq!(derive_slot_status(1, 3), SlotStatus::PartiallyFilled);
        assert_eq!(derive_slot_status(3, 3), SlotStatus::Full);
        assert_eq!(derive_slot_status(4, 3), SlotStatus::Full);
    }
}
