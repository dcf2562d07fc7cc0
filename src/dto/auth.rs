use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::entity::enums::Role;

#[derive(Deserialize, Debug, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Email should be valid"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    pub confirm_password: String,
    #[validate(length(min = 10, max = 16, message = "Phone number should be valid"))]
    pub phone: String,
    pub role: Role,

    pub education_level: Option<String>,
    pub grade: Option<i32>,
    pub school: Option<String>,

    pub bio: Option<String>,
    pub title: Option<String>,
    #[validate(range(min = 0.0))]
    pub hourly_rate: Option<f64>,
    #[validate(range(min = 0))]
    pub years_of_experience: Option<i32>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}
