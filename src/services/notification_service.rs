use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::notifications::{CountData, NotificationList, UpdatedData},
    entity::{
        enums::NotificationType,
        notifications::{
            ActiveModel as NotificationActive, Column as NotificationCol,
            Entity as Notifications, Model as NotificationModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// A notification about to be written.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub link: Option<String>,
}

/// Persist an unread notification on `conn`.
///
/// Callers pass their open transaction so the notification commits or rolls
/// back together with the change that triggered it.
pub async fn dispatch<C>(conn: &C, notice: NewNotification) -> AppResult<NotificationModel>
where
    C: ConnectionTrait,
{
    let notification = NotificationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(notice.recipient),
        title: Set(notice.title),
        message: Set(notice.message),
        is_read: Set(false),
        notification_type: Set(notice.notification_type),
        link: Set(notice.link),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    tracing::debug!(
        notification_id = %notification.id,
        recipient = %notification.user_id,
        kind = ?notification.notification_type,
        "notification dispatched"
    );

    Ok(notification)
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<NotificationList>> {
    let items = Notifications::find()
        .filter(NotificationCol::UserId.eq(user.user_id))
        .order_by_desc(NotificationCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_unread(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<NotificationList>> {
    let items = Notifications::find()
        .filter(unread_for(user.user_id))
        .order_by_desc(NotificationCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "Unread notifications",
        NotificationList { items },
        Some(Meta::empty()),
    ))
}

pub async fn count_unread(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CountData>> {
    let count = Notifications::find()
        .filter(unread_for(user.user_id))
        .count(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Unread count",
        CountData { count },
        Some(Meta::empty()),
    ))
}

pub async fn mark_as_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let existing = find_owned(state, user, id).await?;

    let mut active: NotificationActive = existing.into();
    active.is_read = Set(true);
    let notification = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Notification read",
        Notification::from(notification),
        Some(Meta::empty()),
    ))
}

pub async fn mark_all_as_read(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UpdatedData>> {
    let result = Notifications::update_many()
        .col_expr(NotificationCol::IsRead, Expr::value(true))
        .filter(unread_for(user.user_id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Notifications read",
        UpdatedData {
            updated: result.rows_affected,
        },
        Some(Meta::empty()),
    ))
}

pub async fn delete_notification(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_owned(state, user, id).await?;
    Notifications::delete_by_id(existing.id)
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<NotificationModel> {
    let existing = Notifications::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(n) => n,
        None => return Err(AppError::NotFound),
    };
    if existing.user_id != user.user_id {
        // Someone else's notification looks the same as a missing one.
        return Err(AppError::NotFound);
    }
    Ok(existing)
}

fn unread_for(user_id: Uuid) -> Condition {
    Condition::all()
        .add(NotificationCol::UserId.eq(user_id))
        .add(NotificationCol::IsRead.eq(false))
}
