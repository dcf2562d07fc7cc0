use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        bookings::BookingList,
        reviews::ReviewList,
        tutors::{
            CreateExpertiseRequest, CreateScheduleRequest, ExpertiseList, ScheduleList,
            TutorDetail, TutorList, TutorStats,
        },
        users::{SubjectList, SubjectRefRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{TutorExpertise, TutorSchedule},
    response::ApiResponse,
    routes::params::{BookingRangeQuery, TutorSearchQuery},
    services::{booking_service, review_service, tutor_service},
    state::AppState,
};

/// Public catalog, mounted at `/tutors`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_tutors))
        .route("/{id}", get(get_tutor))
        .route("/{id}/reviews", get(tutor_reviews))
}

/// The signed-in tutor's own data, mounted at `/tutor`.
pub fn self_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/schedule", get(list_schedules).post(add_schedule))
        .route("/schedule/{id}", delete(delete_schedule))
        .route("/expertise", get(list_expertise).post(add_expertise))
        .route("/subjects", post(add_subject))
        .route("/subjects/{id}", delete(remove_subject))
        .route("/bookings/range", get(bookings_in_range))
}

#[utoipa::path(
    get,
    path = "/api/tutors",
    params(
        ("q" = Option<String>, Query, description = "Matches first name, last name or bio"),
        ("subject_id" = Option<Uuid>, Query, description = "Only tutors teaching this subject"),
        ("min_rating" = Option<f64>, Query, description = "Minimum average rating"),
        ("min_price" = Option<f64>, Query, description = "Minimum hourly rate"),
        ("max_price" = Option<f64>, Query, description = "Maximum hourly rate"),
        ("sort_by" = Option<String>, Query, description = "rating, experience or price"),
        ("sort_order" = Option<String>, Query, description = "asc or desc, default desc")
    ),
    responses(
        (status = 200, description = "Active tutors matching the filters", body = ApiResponse<TutorList>)
    ),
    tag = "Tutors"
)]
pub async fn search_tutors(
    State(state): State<AppState>,
    Query(query): Query<TutorSearchQuery>,
) -> AppResult<Json<ApiResponse<TutorList>>> {
    let resp = tutor_service::search_tutors(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tutors/{id}",
    params(("id" = Uuid, Path, description = "Tutor ID")),
    responses(
        (status = 200, description = "Tutor with subjects, schedule and expertise", body = ApiResponse<TutorDetail>),
        (status = 404, description = "Not Found")
    ),
    tag = "Tutors"
)]
pub async fn get_tutor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TutorDetail>>> {
    let resp = tutor_service::get_tutor(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tutors/{id}/reviews",
    params(("id" = Uuid, Path, description = "Tutor ID")),
    responses(
        (status = 200, description = "Reviews about the tutor, newest first", body = ApiResponse<ReviewList>)
    ),
    tag = "Tutors"
)]
pub async fn tutor_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::list_for_tutor(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tutor/stats",
    responses(
        (status = 200, description = "Booking counts and rating", body = ApiResponse<TutorStats>),
        (status = 403, description = "Tutors only")
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TutorStats>>> {
    let resp = tutor_service::tutor_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tutor/schedule",
    responses(
        (status = 200, description = "Own weekly slots", body = ApiResponse<ScheduleList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn list_schedules(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ScheduleList>>> {
    let resp = tutor_service::list_schedules(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/tutor/schedule",
    request_body = CreateScheduleRequest,
    responses(
        (status = 200, description = "Slot added", body = ApiResponse<TutorSchedule>),
        (status = 400, description = "start_time not before end_time"),
        (status = 409, description = "Overlaps an existing slot")
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn add_schedule(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateScheduleRequest>,
) -> AppResult<Json<ApiResponse<TutorSchedule>>> {
    let resp = tutor_service::add_schedule(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/tutor/schedule/{id}",
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Slot removed"),
        (status = 403, description = "Not your slot"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn delete_schedule(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = tutor_service::delete_schedule(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tutor/expertise",
    responses(
        (status = 200, description = "Own expertise entries", body = ApiResponse<ExpertiseList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn list_expertise(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ExpertiseList>>> {
    let resp = tutor_service::list_expertise(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/tutor/expertise",
    request_body = CreateExpertiseRequest,
    responses(
        (status = 200, description = "Expertise added", body = ApiResponse<TutorExpertise>),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn add_expertise(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateExpertiseRequest>,
) -> AppResult<Json<ApiResponse<TutorExpertise>>> {
    let resp = tutor_service::add_expertise(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/tutor/subjects",
    request_body = SubjectRefRequest,
    responses(
        (status = 200, description = "Subject added", body = ApiResponse<SubjectList>),
        (status = 404, description = "Subject not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn add_subject(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubjectRefRequest>,
) -> AppResult<Json<ApiResponse<SubjectList>>> {
    let resp = tutor_service::add_subject(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/tutor/subjects/{id}",
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject removed", body = ApiResponse<SubjectList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn remove_subject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SubjectList>>> {
    let resp = tutor_service::remove_subject(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tutor/bookings/range",
    params(
        ("from" = String, Query, description = "RFC 3339 lower bound on start time"),
        ("to" = String, Query, description = "RFC 3339 upper bound on start time"),
        ("status" = Option<String>, Query, description = "Booking status, default CONFIRMED")
    ),
    responses(
        (status = 200, description = "Bookings starting in the window", body = ApiResponse<BookingList>),
        (status = 400, description = "from after to")
    ),
    security(("bearer_auth" = [])),
    tag = "Tutor"
)]
pub async fn bookings_in_range(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingRangeQuery>,
) -> AppResult<Json<ApiResponse<BookingList>>> {
    let resp = booking_service::list_tutor_in_range(&state, &user, query).await?;
    Ok(Json(resp))
}
