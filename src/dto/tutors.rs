use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entity::enums::DayOfWeek,
    models::{Subject, TutorExpertise, TutorSchedule, TutorSummary},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct TutorList {
    pub items: Vec<TutorSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TutorDetail {
    pub tutor: TutorSummary,
    pub subjects: Vec<Subject>,
    pub schedules: Vec<TutorSchedule>,
    pub expertise: Vec<TutorExpertise>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateScheduleRequest {
    pub day_of_week: DayOfWeek,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "11:00:00")]
    pub end_time: NaiveTime,
    pub available: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleList {
    pub items: Vec<TutorSchedule>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateExpertiseRequest {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub institution: Option<String>,
    pub year_obtained: Option<i32>,
    pub certificate_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExpertiseList {
    pub items: Vec<TutorExpertise>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct TutorStats {
    pub total_bookings: u64,
    pub pending_bookings: u64,
    pub confirmed_bookings: u64,
    pub completed_bookings: u64,
    pub cancelled_bookings: u64,
    pub rejected_bookings: u64,
    pub average_rating: f64,
    pub total_reviews: i32,
}
