use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::AuditEntry;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserStatusRequest {
    /// Explicit flag; omitted means toggle.
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateAdminRequest {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 10, max = 16))]
    pub phone: String,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub admin_level: Option<String>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_students: u64,
    pub total_tutors: u64,
    pub total_admins: u64,
    pub total_bookings: u64,
    pub pending_bookings: u64,
    pub confirmed_bookings: u64,
    pub completed_bookings: u64,
    pub cancelled_bookings: u64,
    pub rejected_bookings: u64,
    pub total_subjects: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityList {
    pub items: Vec<AuditEntry>,
}
