pub mod admin_service;
pub mod auth_service;
pub mod booking_service;
pub mod chat_service;
pub mod notification_service;
pub mod rating_service;
pub mod review_service;
pub mod subject_service;
pub mod tutor_service;
pub mod user_service;
