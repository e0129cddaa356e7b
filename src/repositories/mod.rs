pub(crate) mod exams;
pub(crate) mod grades;
pub(crate) mod questions;
pub(crate) mod school_enrollments;
pub(crate) mod schools;
pub(crate) mod slot_enrollments;
pub(crate) mod slots;
pub(crate) mod submissions;
pub(crate) mod teaching_sessions;
pub(crate) mod users;
