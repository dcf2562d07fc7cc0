use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod doc;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod params;
pub mod reviews;
pub mod subjects;
pub mod tutors;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/subjects", subjects::router())
        .nest("/tutors", tutors::router())
        .nest("/tutor", tutors::self_router())
        .nest("/bookings", bookings::router())
        .nest("/reviews", reviews::router())
        .nest("/messages", messages::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
}
