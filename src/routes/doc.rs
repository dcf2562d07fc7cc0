use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{ActivityList, AdminStats, CreateAdminRequest, UpdateUserStatusRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        bookings::{BookingList, CreateBookingRequest, UpdateNotesRequest},
        chat::{ChatRoomList, ChatRoomSummary, MessageList, OpenChatRoomRequest, SendMessageRequest},
        notifications::{CountData, NotificationList, UpdatedData},
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
        subjects::{CreateSubjectRequest, UpdateSubjectRequest},
        tutors::{
            CreateExpertiseRequest, CreateScheduleRequest, ExpertiseList, ScheduleList,
            TutorDetail, TutorList, TutorStats,
        },
        users::{ChangePasswordRequest, SubjectList, SubjectRefRequest, UpdateProfileRequest, UserList},
    },
    entity::enums::{BookingStatus, DayOfWeek, NotificationType, Role},
    models::{
        AdminProfile, AuditEntry, Booking, ChatRoom, Message, Notification, Review,
        StudentProfile, Subject, TutorExpertise, TutorProfile, TutorSchedule, TutorSummary, User,
        UserProfile,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, bookings, health, messages, notifications, params, reviews, subjects, tutors,
        users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        users::get_profile,
        users::update_profile,
        users::change_password,
        users::list_subjects,
        users::add_subject,
        users::remove_subject,
        subjects::list_subjects,
        tutors::search_tutors,
        tutors::get_tutor,
        tutors::tutor_reviews,
        tutors::stats,
        tutors::list_schedules,
        tutors::add_schedule,
        tutors::delete_schedule,
        tutors::list_expertise,
        tutors::add_expertise,
        tutors::add_subject,
        tutors::remove_subject,
        tutors::bookings_in_range,
        bookings::create_booking,
        bookings::student_bookings,
        bookings::tutor_bookings,
        bookings::upcoming_bookings,
        bookings::get_booking,
        bookings::confirm_booking,
        bookings::complete_booking,
        bookings::cancel_booking,
        bookings::reject_booking,
        bookings::update_notes,
        reviews::create_review,
        reviews::my_reviews,
        reviews::review_for_booking,
        reviews::update_review,
        reviews::delete_review,
        messages::list_rooms,
        messages::open_room,
        messages::get_room,
        messages::list_messages,
        messages::send_message,
        messages::mark_read,
        messages::unread_count,
        notifications::list_notifications,
        notifications::list_unread,
        notifications::count_unread,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_notification,
        admin::list_users,
        admin::create_admin,
        admin::get_user,
        admin::delete_user,
        admin::update_user_status,
        admin::list_bookings,
        admin::delete_booking,
        admin::list_subjects,
        admin::create_subject,
        admin::update_subject,
        admin::delete_subject,
        admin::stats,
        admin::activities
    ),
    components(
        schemas(
            Role,
            BookingStatus,
            NotificationType,
            DayOfWeek,
            User,
            UserProfile,
            StudentProfile,
            TutorProfile,
            AdminProfile,
            TutorSummary,
            Subject,
            TutorSchedule,
            TutorExpertise,
            Booking,
            Review,
            ChatRoom,
            Message,
            Notification,
            AuditEntry,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            ChangePasswordRequest,
            SubjectRefRequest,
            SubjectList,
            UserList,
            CreateSubjectRequest,
            UpdateSubjectRequest,
            TutorList,
            TutorDetail,
            TutorStats,
            CreateScheduleRequest,
            ScheduleList,
            CreateExpertiseRequest,
            ExpertiseList,
            CreateBookingRequest,
            UpdateNotesRequest,
            BookingList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewList,
            OpenChatRoomRequest,
            SendMessageRequest,
            ChatRoomSummary,
            ChatRoomList,
            MessageList,
            NotificationList,
            CountData,
            UpdatedData,
            UpdateUserStatusRequest,
            CreateAdminRequest,
            AdminStats,
            ActivityList,
            params::Pagination,
            params::SortOrder,
            params::TutorSortBy,
            params::TutorSearchQuery,
            params::BookingListQuery,
            params::UserListQuery,
            params::BookingRangeQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<Booking>,
            ApiResponse<BookingList>,
            ApiResponse<Review>,
            ApiResponse<TutorList>,
            ApiResponse<ChatRoomList>,
            ApiResponse<NotificationList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Users", description = "Own profile, password and student subjects"),
        (name = "Subjects", description = "Subject catalog"),
        (name = "Tutors", description = "Public tutor search and detail"),
        (name = "Tutor", description = "Tutor self-service"),
        (name = "Bookings", description = "Booking lifecycle"),
        (name = "Reviews", description = "Tutor reviews"),
        (name = "Messages", description = "Chat rooms and messages"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/bookings/{id}/confirm",
            "/api/reviews",
            "/api/messages/chatrooms/{id}/messages",
            "/api/admin/users/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
