use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::{
    entity::tutors::{Column as TutorCol, Entity as Tutors},
    error::{AppError, AppResult},
    rating::{RatingAggregate, RatingChange},
};

/// Apply one rating change to a tutor's aggregate.
///
/// Must run inside the caller's transaction. The tutor row is locked for the
/// rest of that transaction, and the write is additionally guarded by the
/// row's `version` so a concurrent writer that bypassed the lock surfaces as
/// a conflict instead of a lost update.
pub async fn apply_rating_change<C>(
    conn: &C,
    tutor_id: Uuid,
    change: RatingChange,
) -> AppResult<RatingAggregate>
where
    C: ConnectionTrait,
{
    let tutor = Tutors::find_by_id(tutor_id)
        .lock(LockType::Update)
        .one(conn)
        .await?;
    let tutor = match tutor {
        Some(t) => t,
        None => return Err(AppError::NotFound),
    };

    let current = RatingAggregate::new(tutor.average_rating, tutor.total_reviews);
    let next = current.apply(change);

    let result = Tutors::update_many()
        .col_expr(TutorCol::AverageRating, Expr::value(next.average_rating))
        .col_expr(TutorCol::TotalReviews, Expr::value(next.total_reviews))
        .col_expr(TutorCol::Version, Expr::col(TutorCol::Version).add(1))
        .filter(TutorCol::UserId.eq(tutor_id))
        .filter(TutorCol::Version.eq(tutor.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        tracing::warn!(%tutor_id, version = tutor.version, "rating update lost the race");
        return Err(AppError::Conflict(
            "tutor rating was modified concurrently".into(),
        ));
    }

    tracing::info!(
        %tutor_id,
        ?change,
        average_rating = next.average_rating,
        total_reviews = next.total_reviews,
        "tutor rating updated"
    );

    Ok(next)
}
