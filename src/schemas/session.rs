use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::TeachingSession;
use crate::db::types::SessionStatus;

#[derive(Debug, Deserialize)]
pub(crate) struct VerifySessionRequest {
    pub(crate) approve: bool,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) enrollment_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) start_photo_path: Option<String>,
    pub(crate) end_photo_path: Option<String>,
    pub(crate) distance_from_school_m: Option<f64>,
    pub(crate) within_radius: Option<bool>,
    pub(crate) verification_note: Option<String>,
    pub(crate) verified_by: Option<String>,
    pub(crate) verified_at: Option<String>,
    pub(crate) created_at: String,
}

impl SessionResponse {
    pub(crate) fn from_db(session: TeachingSession) -> Self {
        Self {
            id: session.id,
            enrollment_id: session.enrollment_id,
            status: session.status,
            start_photo_path: session.start_photo_path,
            end_photo_path: session.end_photo_path,
            distance_from_school_m: session.distance_from_school_m,
            within_radius: session.within_radius,
            verification_note: session.verification_note,
            verified_by: session.verified_by,
            verified_at: session.verified_at.map(format_primitive),
            created_at: format_primitive(session.created_at),
        }
    }
}
