use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{School, SchoolEnrollment};
use crate::db::types::{SchoolEnrollmentStatus, SchoolStatus};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SchoolCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[validate(length(min = 1, message = "code must not be empty"))]
    pub(crate) code: String,
    #[validate(length(min = 1, message = "address must not be empty"))]
    pub(crate) address: String,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude out of range"))]
    pub(crate) latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude out of range"))]
    pub(crate) longitude: f64,
    #[serde(default = "default_allowed_radius", alias = "allowedRadiusM")]
    #[validate(range(exclusive_min = 0.0, message = "allowed_radius_m must be positive"))]
    pub(crate) allowed_radius_m: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SchoolUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "address must not be empty"))]
    pub(crate) address: Option<String>,
    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0, message = "latitude out of range"))]
    pub(crate) latitude: Option<f64>,
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0, message = "longitude out of range"))]
    pub(crate) longitude: Option<f64>,
    #[serde(default, alias = "allowedRadiusM")]
    #[validate(range(exclusive_min = 0.0, message = "allowed_radius_m must be positive"))]
    pub(crate) allowed_radius_m: Option<f64>,
    #[serde(default)]
    pub(crate) status: Option<SchoolStatus>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchoolResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) address: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) allowed_radius_m: f64,
    pub(crate) status: SchoolStatus,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl SchoolResponse {
    pub(crate) fn from_db(school: School) -> Self {
        Self {
            id: school.id,
            name: school.name,
            code: school.code,
            address: school.address,
            latitude: school.latitude,
            longitude: school.longitude,
            allowed_radius_m: school.allowed_radius_m,
            status: school.status,
            created_at: format_primitive(school.created_at),
            updated_at: format_primitive(school.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollTeacherRequest {
    #[serde(alias = "teacherId")]
    pub(crate) teacher_id: String,
    #[serde(default)]
    #[serde(alias = "isPrimary")]
    pub(crate) is_primary: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentUpdateRequest {
    #[serde(default)]
    #[serde(alias = "isPrimary")]
    pub(crate) is_primary: Option<bool>,
    #[serde(default)]
    pub(crate) status: Option<SchoolEnrollmentStatus>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchoolEnrollmentResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) teacher_id: String,
    pub(crate) is_primary: bool,
    pub(crate) status: SchoolEnrollmentStatus,
    pub(crate) enrolled_at: String,
}

impl SchoolEnrollmentResponse {
    pub(crate) fn from_db(enrollment: SchoolEnrollment) -> Self {
        Self {
            id: enrollment.id,
            school_id: enrollment.school_id,
            teacher_id: enrollment.teacher_id,
            is_primary: enrollment.is_primary,
            status: enrollment.status,
            enrolled_at: format_primitive(enrollment.enrolled_at),
        }
    }
}

fn default_allowed_radius() -> f64 {
    200.0
}
