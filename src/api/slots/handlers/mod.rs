mod book;
mod cancel;
mod create;
mod list;

pub(in crate::api::slots) use book::book_slot;
pub(in crate::api::slots) use cancel::{cancel_booking, my_enrollments};
pub(in crate::api::slots) use create::{close_slot, create_slot, list_school_slots};
pub(in crate::api::slots) use list::{get_slot, list_open_slots};
