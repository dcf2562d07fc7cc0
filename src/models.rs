use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    admins, audit_logs, bookings, chat_rooms,
    enums::{BookingStatus, DayOfWeek, NotificationType, Role},
    messages, notifications, reviews, students, subjects, tutor_expertise, tutor_schedules,
    tutors, users,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub profile: UserProfile,
}

impl User {
    pub fn from_parts(user: users::Model, profile: UserProfile) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            active: user.active,
            created_at: user.created_at.with_timezone(&Utc),
            last_login: user.last_login.map(|dt| dt.with_timezone(&Utc)),
            profile,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Role-specific half of a user; the variant always matches `User::role`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserProfile {
    Student(StudentProfile),
    Tutor(TutorProfile),
    Admin(AdminProfile),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StudentProfile {
    pub education_level: Option<String>,
    pub grade: Option<i32>,
    pub school: Option<String>,
}

impl From<students::Model> for StudentProfile {
    fn from(model: students::Model) -> Self {
        Self {
            education_level: model.education_level,
            grade: model.grade,
            school: model.school,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TutorProfile {
    pub bio: Option<String>,
    pub title: Option<String>,
    pub hourly_rate: Option<f64>,
    pub years_of_experience: Option<i32>,
    pub profile_picture_url: Option<String>,
    pub average_rating: f64,
    pub total_reviews: i32,
}

impl From<tutors::Model> for TutorProfile {
    fn from(model: tutors::Model) -> Self {
        Self {
            bio: model.bio,
            title: model.title,
            hourly_rate: model.hourly_rate,
            years_of_experience: model.years_of_experience,
            profile_picture_url: model.profile_picture_url,
            average_rating: model.average_rating,
            total_reviews: model.total_reviews,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AdminProfile {
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub admin_level: Option<String>,
}

impl From<admins::Model> for AdminProfile {
    fn from(model: admins::Model) -> Self {
        Self {
            department: model.department,
            job_title: model.job_title,
            admin_level: model.admin_level,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TutorSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub title: Option<String>,
    pub hourly_rate: Option<f64>,
    pub years_of_experience: Option<i32>,
    pub profile_picture_url: Option<String>,
    pub average_rating: f64,
    pub total_reviews: i32,
}

impl TutorSummary {
    pub fn from_parts(tutor: tutors::Model, user: users::Model) -> Self {
        Self {
            id: tutor.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: tutor.bio,
            title: tutor.title,
            hourly_rate: tutor.hourly_rate,
            years_of_experience: tutor.years_of_experience,
            profile_picture_url: tutor.profile_picture_url,
            average_rating: tutor.average_rating,
            total_reviews: tutor.total_reviews,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<subjects::Model> for Subject {
    fn from(model: subjects::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TutorSchedule {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub day_of_week: DayOfWeek,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "11:00:00")]
    pub end_time: NaiveTime,
    pub available: bool,
}

impl From<tutor_schedules::Model> for TutorSchedule {
    fn from(model: tutor_schedules::Model) -> Self {
        Self {
            id: model.id,
            tutor_id: model.tutor_id,
            day_of_week: model.day_of_week,
            start_time: model.start_time,
            end_time: model.end_time,
            available: model.available,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TutorExpertise {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub title: String,
    pub description: String,
    pub institution: Option<String>,
    pub year_obtained: Option<i32>,
    pub certificate_url: Option<String>,
    pub verified: bool,
}

impl From<tutor_expertise::Model> for TutorExpertise {
    fn from(model: tutor_expertise::Model) -> Self {
        Self {
            id: model.id,
            tutor_id: model.tutor_id,
            title: model.title,
            description: model.description,
            institution: model.institution,
            year_obtained: model.year_obtained,
            certificate_url: model.certificate_url,
            verified: model.verified,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub student_id: Uuid,
    pub tutor_id: Uuid,
    pub subject_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub meeting_link: Option<String>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<bookings::Model> for Booking {
    fn from(model: bookings::Model) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            tutor_id: model.tutor_id,
            subject_id: model.subject_id,
            start_time: model.start_time.with_timezone(&Utc),
            end_time: model.end_time.with_timezone(&Utc),
            meeting_link: model.meeting_link,
            notes: model.notes,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub student_id: Uuid,
    pub tutor_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<reviews::Model> for Review {
    fn from(model: reviews::Model) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            tutor_id: model.tutor_id,
            booking_id: model.booking_id,
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatRoom {
    pub id: Uuid,
    pub student_id: Uuid,
    pub tutor_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl From<chat_rooms::Model> for ChatRoom {
    fn from(model: chat_rooms::Model) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            tutor_id: model.tutor_id,
            created_at: model.created_at.with_timezone(&Utc),
            last_message_at: model.last_message_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub is_read: bool,
}

impl From<messages::Model> for Message {
    fn from(model: messages::Model) -> Self {
        Self {
            id: model.id,
            chat_room_id: model.chat_room_id,
            sender_id: model.sender_id,
            content: model.content,
            sent_at: model.sent_at.with_timezone(&Utc),
            read_at: model.read_at.map(|dt| dt.with_timezone(&Utc)),
            is_read: model.is_read,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub notification_type: NotificationType,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            message: model.message,
            is_read: model.is_read,
            notification_type: model.notification_type,
            link: model.link,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<audit_logs::Model> for AuditEntry {
    fn from(model: audit_logs::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            resource: model.resource,
            metadata: model.metadata,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
