mod create;
mod list;
mod manage;
mod questions;

pub(in crate::api::exams) use create::create_exam;
pub(in crate::api::exams) use list::{list_exam_submissions, list_my_exams, list_school_exams};
pub(in crate::api::exams) use manage::{
    activate_exam, close_exam, delete_exam, get_exam, reopen_exam, update_exam,
};
pub(in crate::api::exams) use questions::{add_question, delete_question};
