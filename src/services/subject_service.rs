use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::{
        subjects::{CreateSubjectRequest, UpdateSubjectRequest},
        users::SubjectList,
    },
    entity::{
        bookings::{Column as BookingCol, Entity as Bookings},
        student_subjects::{Column as StudentSubjectCol, Entity as StudentSubjects},
        subjects::{ActiveModel as SubjectActive, Column as SubjectCol, Entity as Subjects},
        tutor_subjects::{Column as TutorSubjectCol, Entity as TutorSubjects},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Subject,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_subjects(state: &AppState) -> AppResult<ApiResponse<SubjectList>> {
    let items = Subjects::find()
        .order_by_asc(SubjectCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Subject::from)
        .collect();

    Ok(ApiResponse::success(
        "Subjects",
        SubjectList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_subject(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSubjectRequest,
) -> AppResult<ApiResponse<Subject>> {
    ensure_admin(user)?;
    payload.validate()?;
    ensure_name_free(state, &payload.name, None).await?;

    let subject = SubjectActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "subject_create",
        "subjects",
        json!({ "subject_id": subject.id, "name": subject.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Subject created",
        Subject::from(subject),
        Some(Meta::empty()),
    ))
}

pub async fn update_subject(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSubjectRequest,
) -> AppResult<ApiResponse<Subject>> {
    ensure_admin(user)?;
    payload.validate()?;

    let existing = match Subjects::find_by_id(id).one(&state.orm).await? {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: SubjectActive = existing.into();
    if let Some(name) = payload.name {
        ensure_name_free(state, &name, Some(id)).await?;
        active.name = Set(name);
    }
    if payload.description.is_some() {
        active.description = Set(payload.description);
    }
    let subject = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Subject updated",
        Subject::from(subject),
        Some(Meta::empty()),
    ))
}

/// Drop a subject and its tutor/student links. Subjects still referenced by a
/// booking stay.
pub async fn delete_subject(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    if Subjects::find_by_id(id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let booked = Bookings::find()
        .filter(BookingCol::SubjectId.eq(id))
        .count(&txn)
        .await?;
    if booked > 0 {
        return Err(AppError::Conflict("subject is referenced by bookings".into()));
    }

    TutorSubjects::delete_many()
        .filter(TutorSubjectCol::SubjectId.eq(id))
        .exec(&txn)
        .await?;
    StudentSubjects::delete_many()
        .filter(StudentSubjectCol::SubjectId.eq(id))
        .exec(&txn)
        .await?;
    Subjects::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "subject_delete",
        "subjects",
        json!({ "subject_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn ensure_name_free(state: &AppState, name: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Subjects::find().filter(SubjectCol::Name.eq(name));
    if let Some(id) = except {
        finder = finder.filter(SubjectCol::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::Conflict(format!("subject '{name}' already exists")));
    }
    Ok(())
}
