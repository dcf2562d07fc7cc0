pub mod admin;
pub mod auth;
pub mod bookings;
pub mod chat;
pub mod notifications;
pub mod reviews;
pub mod subjects;
pub mod tutors;
pub mod users;
