use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::users::{ChangePasswordRequest, SubjectList, SubjectRefRequest, UpdateProfileRequest},
    entity::{
        admins::{self, Entity as Admins},
        bookings::{Column as BookingCol, Entity as Bookings},
        chat_rooms::{Column as RoomCol, Entity as ChatRooms},
        enums::Role,
        messages::{Column as MessageCol, Entity as Messages},
        notifications::{Column as NotificationCol, Entity as Notifications},
        reviews::{Column as ReviewCol, Entity as Reviews},
        student_subjects::{self, Column as StudentSubjectCol, Entity as StudentSubjects},
        students::{self, Entity as Students},
        subjects::{Column as SubjectCol, Entity as Subjects},
        tutor_expertise::{Column as ExpertiseCol, Entity as TutorExpertise},
        tutor_schedules::{Column as ScheduleCol, Entity as TutorSchedules},
        tutor_subjects::{Column as TutorSubjectCol, Entity as TutorSubjects},
        tutors::{self, Entity as Tutors},
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::{AdminProfile, StudentProfile, Subject, TutorProfile, User, UserProfile},
    rating::RatingChange,
    response::{ApiResponse, Meta},
    services::{
        auth_service::{hash_password, verify_password},
        rating_service::apply_rating_change,
    },
    state::AppState,
};

/// Fetch a user row or fail with `NotFound`.
pub async fn load_user<C>(conn: &C, id: Uuid) -> AppResult<users::Model>
where
    C: ConnectionTrait,
{
    match Users::find_by_id(id).one(conn).await? {
        Some(u) => Ok(u),
        None => Err(AppError::NotFound),
    }
}

/// Attach the role-specific profile row. A missing row yields an empty profile.
pub async fn assemble_user<C>(conn: &C, user: users::Model) -> AppResult<User>
where
    C: ConnectionTrait,
{
    let profile = match user.role {
        Role::Student => UserProfile::Student(
            Students::find_by_id(user.id)
                .one(conn)
                .await?
                .map(StudentProfile::from)
                .unwrap_or_default(),
        ),
        Role::Tutor => UserProfile::Tutor(
            Tutors::find_by_id(user.id)
                .one(conn)
                .await?
                .map(TutorProfile::from)
                .unwrap_or_default(),
        ),
        Role::Admin => UserProfile::Admin(
            Admins::find_by_id(user.id)
                .one(conn)
                .await?
                .map(AdminProfile::from)
                .unwrap_or_default(),
        ),
    };
    Ok(User::from_parts(user, profile))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = load_user(&state.orm, user.user_id).await?;
    let profile = assemble_user(&state.orm, model).await?;
    Ok(ApiResponse::success("Profile", profile, Some(Meta::empty())))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let existing = load_user(&txn, user.user_id).await?;
    let role = existing.role;

    let mut active: users::ActiveModel = existing.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone);
    }
    let updated = active.update(&txn).await?;

    match role {
        Role::Student => {
            if let Some(student) = Students::find_by_id(updated.id).one(&txn).await? {
                let mut active: students::ActiveModel = student.into();
                if payload.education_level.is_some() {
                    active.education_level = Set(payload.education_level);
                }
                if payload.grade.is_some() {
                    active.grade = Set(payload.grade);
                }
                if payload.school.is_some() {
                    active.school = Set(payload.school);
                }
                active.update(&txn).await?;
            }
        }
        Role::Tutor => {
            if let Some(tutor) = Tutors::find_by_id(updated.id).one(&txn).await? {
                // Rating fields are owned by the review flow and never touched here.
                let mut active: tutors::ActiveModel = tutor.into();
                if payload.bio.is_some() {
                    active.bio = Set(payload.bio);
                }
                if payload.title.is_some() {
                    active.title = Set(payload.title);
                }
                if payload.hourly_rate.is_some() {
                    active.hourly_rate = Set(payload.hourly_rate);
                }
                if payload.years_of_experience.is_some() {
                    active.years_of_experience = Set(payload.years_of_experience);
                }
                if payload.profile_picture_url.is_some() {
                    active.profile_picture_url = Set(payload.profile_picture_url);
                }
                active.update(&txn).await?;
            }
        }
        Role::Admin => {
            if let Some(admin) = Admins::find_by_id(updated.id).one(&txn).await? {
                let mut active: admins::ActiveModel = admin.into();
                if payload.department.is_some() {
                    active.department = Set(payload.department);
                }
                if payload.job_title.is_some() {
                    active.job_title = Set(payload.job_title);
                }
                if payload.admin_level.is_some() {
                    active.admin_level = Set(payload.admin_level);
                }
                active.update(&txn).await?;
            }
        }
    }

    let profile = assemble_user(&txn, updated).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("Profile updated", profile, Some(Meta::empty())))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    payload.validate()?;

    let existing = load_user(&state.orm, user.user_id).await?;
    if !verify_password(&payload.current_password, &existing.password_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let password_hash = hash_password(&payload.new_password)?;
    let mut active = existing.into_active_model();
    active.password_hash = Set(password_hash);
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "password_change",
        "users",
        json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password changed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_student_subjects(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SubjectList>> {
    ensure_role(user, Role::Student)?;

    let subject_ids: Vec<Uuid> = StudentSubjects::find()
        .filter(StudentSubjectCol::StudentId.eq(user.user_id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|link| link.subject_id)
        .collect();

    let items = Subjects::find()
        .filter(SubjectCol::Id.is_in(subject_ids))
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

/// Link a subject to the calling student. Linking twice is a no-op.
pub async fn add_student_subject(
    state: &AppState,
    user: &AuthUser,
    payload: SubjectRefRequest,
) -> AppResult<ApiResponse<SubjectList>> {
    ensure_role(user, Role::Student)?;
    if Subjects::find_by_id(payload.subject_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    StudentSubjects::insert(student_subjects::ActiveModel {
        student_id: Set(user.user_id),
        subject_id: Set(payload.subject_id),
    })
    .on_conflict(
        OnConflict::columns([StudentSubjectCol::StudentId, StudentSubjectCol::SubjectId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    list_student_subjects(state, user).await
}

pub async fn remove_student_subject(
    state: &AppState,
    user: &AuthUser,
    subject_id: Uuid,
) -> AppResult<ApiResponse<SubjectList>> {
    ensure_role(user, Role::Student)?;
    StudentSubjects::delete_many()
        .filter(StudentSubjectCol::StudentId.eq(user.user_id))
        .filter(StudentSubjectCol::SubjectId.eq(subject_id))
        .exec(&state.orm)
        .await?;

    list_student_subjects(state, user).await
}

/// Remove a user and everything hanging off it, in dependency order.
///
/// Reviews a student wrote are rolled out of each tutor's aggregate before
/// they go. Audit logs are kept.
pub async fn delete_user_cascade<C>(conn: &C, user: &users::Model) -> AppResult<()>
where
    C: ConnectionTrait,
{
    match user.role {
        Role::Student => {
            let authored = Reviews::find()
                .filter(ReviewCol::StudentId.eq(user.id))
                .all(conn)
                .await?;
            for review in authored {
                apply_rating_change(conn, review.tutor_id, RatingChange::Remove(review.rating))
                    .await?;
                Reviews::delete_by_id(review.id).exec(conn).await?;
            }

            Bookings::delete_many()
                .filter(BookingCol::StudentId.eq(user.id))
                .exec(conn)
                .await?;
            delete_rooms(conn, RoomCol::StudentId.eq(user.id)).await?;
            StudentSubjects::delete_many()
                .filter(StudentSubjectCol::StudentId.eq(user.id))
                .exec(conn)
                .await?;
            Students::delete_by_id(user.id).exec(conn).await?;
        }
        Role::Tutor => {
            Reviews::delete_many()
                .filter(ReviewCol::TutorId.eq(user.id))
                .exec(conn)
                .await?;
            Bookings::delete_many()
                .filter(BookingCol::TutorId.eq(user.id))
                .exec(conn)
                .await?;
            delete_rooms(conn, RoomCol::TutorId.eq(user.id)).await?;
            TutorSchedules::delete_many()
                .filter(ScheduleCol::TutorId.eq(user.id))
                .exec(conn)
                .await?;
            TutorExpertise::delete_many()
                .filter(ExpertiseCol::TutorId.eq(user.id))
                .exec(conn)
                .await?;
            TutorSubjects::delete_many()
                .filter(TutorSubjectCol::TutorId.eq(user.id))
                .exec(conn)
                .await?;
            Tutors::delete_by_id(user.id).exec(conn).await?;
        }
        Role::Admin => {
            Admins::delete_by_id(user.id).exec(conn).await?;
        }
    }

    Notifications::delete_many()
        .filter(NotificationCol::UserId.eq(user.id))
        .exec(conn)
        .await?;
    Users::delete_by_id(user.id).exec(conn).await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user deleted");
    Ok(())
}

async fn delete_rooms<C>(conn: &C, owner: sea_orm::sea_query::SimpleExpr) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let room_ids: Vec<Uuid> = ChatRooms::find()
        .filter(owner)
        .all(conn)
        .await?
        .into_iter()
        .map(|room| room.id)
        .collect();
    if room_ids.is_empty() {
        return Ok(());
    }

    Messages::delete_many()
        .filter(MessageCol::ChatRoomId.is_in(room_ids.clone()))
        .exec(conn)
        .await?;
    ChatRooms::delete_many()
        .filter(RoomCol::Id.is_in(room_ids))
        .exec(conn)
        .await?;
    Ok(())
}
