use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    booking::{BookingAction, NameSource, Participants, Party, request_notice},
    dto::bookings::{BookingList, CreateBookingRequest, UpdateNotesRequest},
    entity::{
        bookings::{ActiveModel as BookingActive, Column as BookingCol, Entity as Bookings, Model as BookingModel},
        enums::{BookingStatus, Role},
        reviews::{Column as ReviewCol, Entity as Reviews},
        subjects::Entity as Subjects,
        tutors::Entity as Tutors,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::Booking,
    rating::RatingChange,
    response::{ApiResponse, Meta},
    routes::params::BookingRangeQuery,
    services::{
        notification_service::{self, NewNotification},
        rating_service::apply_rating_change,
        user_service::load_user,
    },
    state::AppState,
};

pub async fn create_booking(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookingRequest,
) -> AppResult<ApiResponse<Booking>> {
    ensure_role(user, Role::Student)?;
    if payload.start_time >= payload.end_time {
        return Err(AppError::BadRequest(
            "start_time must be before end_time".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    if Tutors::find_by_id(payload.tutor_id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound);
    }
    if Subjects::find_by_id(payload.subject_id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let student = load_user(&txn, user.user_id).await?;

    let booking = BookingActive {
        id: Set(Uuid::new_v4()),
        student_id: Set(user.user_id),
        tutor_id: Set(payload.tutor_id),
        subject_id: Set(payload.subject_id),
        start_time: Set(payload.start_time.into()),
        end_time: Set(payload.end_time.into()),
        meeting_link: Set(None),
        notes: Set(payload.notes),
        status: Set(BookingStatus::Pending),
        created_at: NotSet,
        updated_at: Set(None),
    }
    .insert(&txn)
    .await?;

    let notice = request_notice();
    notification_service::dispatch(
        &txn,
        NewNotification {
            recipient: booking.tutor_id,
            title: notice.title.to_string(),
            message: notice.body(&student.full_name()),
            notification_type: notice.notification_type,
            link: Some(notice.link(booking.id)),
        },
    )
    .await?;

    txn.commit().await?;

    tracing::info!(booking_id = %booking.id, student_id = %booking.student_id, tutor_id = %booking.tutor_id, "booking requested");

    Ok(ApiResponse::success(
        "Booking created",
        Booking::from(booking),
        Some(Meta::empty()),
    ))
}

pub async fn confirm_booking(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Booking>> {
    transition(state, user, id, BookingAction::Confirm).await
}

pub async fn complete_booking(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Booking>> {
    transition(state, user, id, BookingAction::Complete).await
}

pub async fn cancel_booking(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Booking>> {
    transition(state, user, id, BookingAction::Cancel).await
}

pub async fn reject_booking(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Booking>> {
    transition(state, user, id, BookingAction::Reject).await
}

/// Move a booking to the action's status and send its notification, both in
/// one transaction.
pub async fn transition(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    action: BookingAction,
) -> AppResult<ApiResponse<Booking>> {
    let txn = state.orm.begin().await?;

    let booking = Bookings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    if !action.is_allowed(participants(&booking), user.user_id, user.role) {
        return Err(AppError::Forbidden);
    }

    if action.leaves_terminal(booking.status) {
        // Kept permissive: finished bookings can still be moved.
        tracing::warn!(
            booking_id = %booking.id,
            from = booking.status.as_str(),
            to = action.target_status().as_str(),
            "booking transition out of a terminal state"
        );
    }

    let plan = action.plan(user.role == Role::Student);
    let previous = booking.status;

    let mut active: BookingActive = booking.into();
    active.status = Set(plan.status);
    active.updated_at = Set(Some(Utc::now().into()));
    let booking = active.update(&txn).await?;

    if let Some(notice) = plan.notice {
        let recipient = match notice.recipient {
            Party::Student => booking.student_id,
            Party::Tutor => booking.tutor_id,
        };
        let named_id = match notice.named {
            NameSource::Student => booking.student_id,
            NameSource::Tutor => booking.tutor_id,
            NameSource::Actor => user.user_id,
        };
        let named = load_user(&txn, named_id).await?;

        notification_service::dispatch(
            &txn,
            NewNotification {
                recipient,
                title: notice.title.to_string(),
                message: notice.body(&named.full_name()),
                notification_type: notice.notification_type,
                link: Some(notice.link(booking.id)),
            },
        )
        .await?;
    }

    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        action = action.as_str(),
        from = previous.as_str(),
        to = booking.status.as_str(),
        actor = %user.user_id,
        "booking status changed"
    );

    Ok(ApiResponse::success(
        "Booking updated",
        Booking::from(booking),
        Some(Meta::empty()),
    ))
}

pub async fn update_notes(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateNotesRequest,
) -> AppResult<ApiResponse<Booking>> {
    let booking = find_visible(state, user, id).await?;

    let mut active: BookingActive = booking.into();
    active.notes = Set(payload.notes);
    active.updated_at = Set(Some(Utc::now().into()));
    let booking = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Booking updated",
        Booking::from(booking),
        Some(Meta::empty()),
    ))
}

pub async fn get_booking(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Booking>> {
    let booking = find_visible(state, user, id).await?;
    Ok(ApiResponse::success(
        "Booking",
        Booking::from(booking),
        Some(Meta::empty()),
    ))
}

pub async fn list_for_student(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<BookingList>> {
    ensure_role(user, Role::Student)?;
    list_where(state, Condition::all().add(BookingCol::StudentId.eq(user.user_id))).await
}

pub async fn list_for_tutor(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<BookingList>> {
    ensure_role(user, Role::Tutor)?;
    list_where(state, Condition::all().add(BookingCol::TutorId.eq(user.user_id))).await
}

/// Pending or confirmed bookings that have not ended yet, soonest first.
pub async fn list_upcoming(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<BookingList>> {
    let owner = match user.role {
        Role::Student => BookingCol::StudentId.eq(user.user_id),
        Role::Tutor => BookingCol::TutorId.eq(user.user_id),
        Role::Admin => return Err(AppError::Forbidden),
    };

    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let items = Bookings::find()
        .filter(
            Condition::all()
                .add(owner)
                .add(BookingCol::EndTime.gt(now))
                .add(BookingCol::Status.is_in([BookingStatus::Pending, BookingStatus::Confirmed])),
        )
        .order_by_asc(BookingCol::StartTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Booking::from)
        .collect();

    Ok(ApiResponse::success(
        "Upcoming bookings",
        BookingList { items },
        Some(Meta::empty()),
    ))
}

/// A tutor's bookings in one status starting inside `[from, to]`.
pub async fn list_tutor_in_range(
    state: &AppState,
    user: &AuthUser,
    query: BookingRangeQuery,
) -> AppResult<ApiResponse<BookingList>> {
    ensure_role(user, Role::Tutor)?;
    if query.from > query.to {
        return Err(AppError::BadRequest("from must not be after to".into()));
    }
    let status = query.status.unwrap_or(BookingStatus::Confirmed);

    let from: sea_orm::prelude::DateTimeWithTimeZone = query.from.into();
    let to: sea_orm::prelude::DateTimeWithTimeZone = query.to.into();
    let items = Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::TutorId.eq(user.user_id))
                .add(BookingCol::StartTime.between(from, to))
                .add(BookingCol::Status.eq(status)),
        )
        .order_by_asc(BookingCol::StartTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Booking::from)
        .collect();

    Ok(ApiResponse::success(
        "Bookings",
        BookingList { items },
        Some(Meta::empty()),
    ))
}

/// Delete a booking and the review attached to it, rolling the review's
/// rating out of the tutor aggregate first.
pub(crate) async fn purge_booking<C>(conn: &C, booking: &BookingModel) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let reviews = Reviews::find()
        .filter(ReviewCol::BookingId.eq(booking.id))
        .all(conn)
        .await?;
    for review in reviews {
        apply_rating_change(conn, review.tutor_id, RatingChange::Remove(review.rating)).await?;
        Reviews::delete_by_id(review.id).exec(conn).await?;
    }

    Bookings::delete_by_id(booking.id).exec(conn).await?;
    Ok(())
}

async fn list_where(state: &AppState, condition: Condition) -> AppResult<ApiResponse<BookingList>> {
    let items = Bookings::find()
        .filter(condition)
        .order_by_desc(BookingCol::StartTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Booking::from)
        .collect();

    Ok(ApiResponse::success(
        "Bookings",
        BookingList { items },
        Some(Meta::empty()),
    ))
}

async fn find_visible(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<BookingModel> {
    let booking = Bookings::find_by_id(id).one(&state.orm).await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };
    let p = participants(&booking);
    if user.is_admin() || user.user_id == p.student_id || user.user_id == p.tutor_id {
        Ok(booking)
    } else {
        Err(AppError::Forbidden)
    }
}

fn participants(booking: &BookingModel) -> Participants {
    Participants {
        student_id: booking.student_id,
        tutor_id: booking.tutor_id,
    }
}
