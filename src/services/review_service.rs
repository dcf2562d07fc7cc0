use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
    entity::{
        bookings::Entity as Bookings,
        enums::{NotificationType, Role},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews, Model as ReviewModel},
        tutors::Entity as Tutors,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_admin, ensure_role},
    models::Review,
    rating::RatingChange,
    response::{ApiResponse, Meta},
    services::{
        notification_service::{self, NewNotification},
        rating_service::apply_rating_change,
        user_service::load_user,
    },
    state::AppState,
};

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_role(user, Role::Student)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;

    if Tutors::find_by_id(payload.tutor_id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound);
    }

    if let Some(booking_id) = payload.booking_id {
        // Reviewers of one booking queue here; the later one sees the earlier review.
        let booking = Bookings::find_by_id(booking_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let booking = match booking {
            Some(b) => b,
            None => return Err(AppError::NotFound),
        };
        if booking.student_id != user.user_id || booking.tutor_id != payload.tutor_id {
            return Err(AppError::BadRequest(
                "booking does not belong to this student and tutor".into(),
            ));
        }
        let existing = Reviews::find()
            .filter(ReviewCol::BookingId.eq(booking_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("booking already reviewed".into()));
        }
    }

    apply_rating_change(&txn, payload.tutor_id, RatingChange::Add(payload.rating)).await?;

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        student_id: Set(user.user_id),
        tutor_id: Set(payload.tutor_id),
        booking_id: Set(payload.booking_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
        updated_at: Set(None),
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("booking already reviewed".into())
        }
        _ => AppError::OrmError(err),
    })?;

    let student = load_user(&txn, user.user_id).await?;
    notification_service::dispatch(
        &txn,
        NewNotification {
            recipient: review.tutor_id,
            title: "New Review".into(),
            message: format!("You have received a new review from {}", student.full_name()),
            notification_type: NotificationType::SystemAlert,
            link: Some("/tutor/reviews".into()),
        },
    )
    .await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "review_create",
        "review",
        json!({ "review_id": review.id, "tutor_id": review.tutor_id, "rating": review.rating }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review created",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    payload.validate()?;

    let txn = state.orm.begin().await?;

    let existing = find_review(&txn, id).await?;
    ensure_owner_or_admin(user, existing.student_id)?;

    apply_rating_change(
        &txn,
        existing.tutor_id,
        RatingChange::Replace {
            old: existing.rating,
            new: payload.rating,
        },
    )
    .await?;

    let mut active: ReviewActive = existing.into();
    active.rating = Set(payload.rating);
    active.comment = Set(payload.comment);
    active.updated_at = Set(Some(Utc::now().into()));
    let review = active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review updated",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    let existing = find_review(&txn, id).await?;
    ensure_owner_or_admin(user, existing.student_id)?;

    apply_rating_change(&txn, existing.tutor_id, RatingChange::Remove(existing.rating)).await?;
    Reviews::delete_by_id(existing.id).exec(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "review_delete",
        "review",
        json!({ "review_id": existing.id, "tutor_id": existing.tutor_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_for_tutor(state: &AppState, tutor_id: Uuid) -> AppResult<ApiResponse<ReviewList>> {
    let items = Reviews::find()
        .filter(ReviewCol::TutorId.eq(tutor_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_mine(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ReviewList>> {
    ensure_role(user, Role::Student)?;
    let items = Reviews::find()
        .filter(ReviewCol::StudentId.eq(user.user_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_for_booking(state: &AppState, booking_id: Uuid) -> AppResult<ApiResponse<Review>> {
    let review = Reviews::find()
        .filter(ReviewCol::BookingId.eq(booking_id))
        .one(&state.orm)
        .await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Review",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

async fn find_review<C>(conn: &C, id: Uuid) -> AppResult<ReviewModel>
where
    C: sea_orm::ConnectionTrait,
{
    match Reviews::find_by_id(id).one(conn).await? {
        Some(r) => Ok(r),
        None => Err(AppError::NotFound),
    }
}
