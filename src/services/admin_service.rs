use sea_orm::sea_query::LockType;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::{
        admin::{ActivityList, AdminStats, CreateAdminRequest, UpdateUserStatusRequest},
        bookings::BookingList,
        users::UserList,
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        bookings::{Column as BookingCol, Entity as Bookings},
        enums::{BookingStatus, Role},
        subjects::Entity as Subjects,
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{AuditEntry, Booking, User},
    response::{ApiResponse, Meta},
    routes::params::{BookingListQuery, Pagination, SortOrder, UserListQuery},
    services::{
        auth_service::{NewAccount, ProfileSeed, create_account},
        booking_service::purge_booking,
        user_service::{assemble_user, delete_user_cascade, load_user},
    },
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(role) = query.role {
        condition = condition.add(UserCol::Role.eq(role));
    }
    if let Some(q) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{q}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::FirstName).ilike(pattern.clone()))
                .add(Expr::col(UserCol::LastName).ilike(pattern.clone()))
                .add(Expr::col(UserCol::Email).ilike(pattern)),
        );
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(assemble_user(&state.orm, row).await?);
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let model = load_user(&state.orm, id).await?;
    let data = assemble_user(&state.orm, model).await?;
    Ok(ApiResponse::success("User found", data, Some(Meta::empty())))
}

/// Set the active flag, or flip it when the request leaves it out.
pub async fn update_user_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserStatusRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Users::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let active_flag = payload.active.unwrap_or(!existing.active);
    let mut active: UserActive = existing.into();
    active.active = Set(active_flag);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_status_update",
        "users",
        json!({ "user_id": updated.id, "active": updated.active }),
    )
    .await;

    let data = assemble_user(&state.orm, updated).await?;
    Ok(ApiResponse::success("User updated", data, Some(Meta::empty())))
}

pub async fn create_admin(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAdminRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    payload.validate()?;

    let account = NewAccount {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        password: payload.password,
        phone: payload.phone,
    };
    let seed = ProfileSeed::Admin {
        department: payload.department,
        job_title: payload.job_title,
        admin_level: payload.admin_level,
    };
    let id = create_account(&state.pool, account, seed).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "admin_create",
        "users",
        json!({ "user_id": id }),
    )
    .await;

    let model = load_user(&state.orm, id).await?;
    let data = assemble_user(&state.orm, model).await?;
    Ok(ApiResponse::success("Admin created", data, Some(Meta::empty())))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("Admins cannot delete themselves".into()));
    }

    let txn = state.orm.begin().await?;
    let existing = load_user(&txn, id).await?;
    delete_user_cascade(&txn, &existing).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_delete",
        "users",
        json!({ "user_id": id, "role": existing.role.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_bookings(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Bookings::find();
    if let Some(status) = query.status {
        finder = finder.filter(BookingCol::Status.eq(status));
    }
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(BookingCol::StartTime),
        SortOrder::Desc => finder.order_by_desc(BookingCol::StartTime),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Booking::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Bookings", BookingList { items }, Some(meta)))
}

pub async fn delete_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let booking = Bookings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };
    purge_booking(&txn, &booking).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "booking_delete",
        "bookings",
        json!({ "booking_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<AdminStats>> {
    ensure_admin(user)?;

    let count_role = |role: Role| Users::find().filter(UserCol::Role.eq(role)).count(&state.orm);

    let mut data = AdminStats {
        total_users: Users::find().count(&state.orm).await?,
        total_students: count_role(Role::Student).await?,
        total_tutors: count_role(Role::Tutor).await?,
        total_admins: count_role(Role::Admin).await?,
        total_subjects: Subjects::find().count(&state.orm).await?,
        ..AdminStats::default()
    };

    let counts: Vec<(BookingStatus, i64)> = Bookings::find()
        .select_only()
        .column(BookingCol::Status)
        .column_as(Expr::col(BookingCol::Id).count(), "total")
        .group_by(BookingCol::Status)
        .into_tuple()
        .all(&state.orm)
        .await?;
    for (status, n) in counts {
        let n = n.max(0) as u64;
        data.total_bookings += n;
        match status {
            BookingStatus::Pending => data.pending_bookings = n,
            BookingStatus::Confirmed => data.confirmed_bookings = n,
            BookingStatus::Completed => data.completed_bookings = n,
            BookingStatus::Cancelled => data.cancelled_bookings = n,
            BookingStatus::Rejected => data.rejected_bookings = n,
        }
    }

    Ok(ApiResponse::success("Stats", data, Some(Meta::empty())))
}

/// Audit trail, newest first.
pub async fn list_activities(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ActivityList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = AuditLogs::find().order_by_desc(AuditCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(AuditEntry::from)
        .collect();

    Ok(ApiResponse::success(
        "Activities",
        ActivityList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
