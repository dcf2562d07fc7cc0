use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Subject, User};

/// Every field is optional; role-specific fields are ignored for other roles.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1))]
    pub first_name: Option<String>,
    #[validate(length(min = 1))]
    pub last_name: Option<String>,
    #[validate(length(min = 10, max = 16))]
    pub phone: Option<String>,

    pub education_level: Option<String>,
    pub grade: Option<i32>,
    pub school: Option<String>,

    pub bio: Option<String>,
    pub title: Option<String>,
    #[validate(range(min = 0.0))]
    pub hourly_rate: Option<f64>,
    #[validate(range(min = 0))]
    pub years_of_experience: Option<i32>,
    pub profile_picture_url: Option<String>,

    pub department: Option<String>,
    pub job_title: Option<String>,
    pub admin_level: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubjectRefRequest {
    pub subject_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubjectList {
    pub items: Vec<Subject>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}
