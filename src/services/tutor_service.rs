use chrono::NaiveTime;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        tutors::{
            CreateExpertiseRequest, CreateScheduleRequest, ExpertiseList, ScheduleList,
            TutorDetail, TutorList, TutorStats,
        },
        users::{SubjectList, SubjectRefRequest},
    },
    entity::{
        bookings::{Column as BookingCol, Entity as Bookings},
        enums::{BookingStatus, Role},
        subjects::{Column as SubjectCol, Entity as Subjects},
        tutor_expertise::{self, Column as ExpertiseCol, Entity as TutorExpertise},
        tutor_schedules::{self, Column as ScheduleCol, Entity as TutorSchedules},
        tutor_subjects::{self, Column as TutorSubjectCol, Entity as TutorSubjects},
        tutors::{Column as TutorCol, Entity as Tutors},
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::{self, Subject, TutorSummary},
    response::{ApiResponse, Meta},
    routes::params::{SortOrder, TutorSearchQuery, TutorSortBy},
    state::AppState,
};

/// Inclusive overlap: slots that merely touch at an edge still collide.
pub fn slots_overlap(a: (NaiveTime, NaiveTime), b: (NaiveTime, NaiveTime)) -> bool {
    !(a.1 < b.0 || a.0 > b.1)
}

/// Active tutors matching every supplied filter.
pub async fn search_tutors(state: &AppState, query: TutorSearchQuery) -> AppResult<ApiResponse<TutorList>> {
    let mut condition = Condition::all().add(Expr::col((Users, users::Column::Active)).eq(true));

    if let Some(q) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{q}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Users, users::Column::FirstName)).ilike(pattern.clone()))
                .add(Expr::col((Users, users::Column::LastName)).ilike(pattern.clone()))
                .add(Expr::col((Tutors, TutorCol::Bio)).ilike(pattern)),
        );
    }
    if let Some(min_rating) = query.min_rating {
        condition = condition.add(TutorCol::AverageRating.gte(min_rating));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(TutorCol::HourlyRate.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(TutorCol::HourlyRate.lte(max_price));
    }
    if let Some(subject_id) = query.subject_id {
        let tutor_ids: Vec<Uuid> = TutorSubjects::find()
            .select_only()
            .column(TutorSubjectCol::TutorId)
            .filter(TutorSubjectCol::SubjectId.eq(subject_id))
            .into_tuple()
            .all(&state.orm)
            .await?;
        condition = condition.add(TutorCol::UserId.is_in(tutor_ids));
    }

    let column = match query.sort_by.unwrap_or(TutorSortBy::Rating) {
        TutorSortBy::Rating => TutorCol::AverageRating,
        TutorSortBy::Experience => TutorCol::YearsOfExperience,
        TutorSortBy::Price => TutorCol::HourlyRate,
    };
    let finder = Tutors::find().find_also_related(Users).filter(condition);
    let finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(column),
        SortOrder::Desc => finder.order_by_desc(column),
    };

    let items = finder
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(tutor, user)| user.map(|u| TutorSummary::from_parts(tutor, u)))
        .collect();

    Ok(ApiResponse::success(
        "Tutors",
        TutorList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_tutor(state: &AppState, tutor_id: Uuid) -> AppResult<ApiResponse<TutorDetail>> {
    let found = Tutors::find_by_id(tutor_id)
        .find_also_related(Users)
        .one(&state.orm)
        .await?;
    let (tutor, user) = match found {
        Some((tutor, Some(user))) => (tutor, user),
        _ => return Err(AppError::NotFound),
    };

    let subjects = subjects_of(state, tutor_id).await?;
    let schedules = TutorSchedules::find()
        .filter(ScheduleCol::TutorId.eq(tutor_id))
        .order_by_asc(ScheduleCol::StartTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(models::TutorSchedule::from)
        .collect();
    let expertise = TutorExpertise::find()
        .filter(ExpertiseCol::TutorId.eq(tutor_id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(models::TutorExpertise::from)
        .collect();

    Ok(ApiResponse::success(
        "Tutor",
        TutorDetail {
            tutor: TutorSummary::from_parts(tutor, user),
            subjects,
            schedules,
            expertise,
        },
        Some(Meta::empty()),
    ))
}

pub async fn tutor_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<TutorStats>> {
    ensure_role(user, Role::Tutor)?;

    let tutor = match Tutors::find_by_id(user.user_id).one(&state.orm).await? {
        Some(t) => t,
        None => return Err(AppError::NotFound),
    };

    let counts: Vec<(BookingStatus, i64)> = Bookings::find()
        .select_only()
        .column(BookingCol::Status)
        .column_as(Expr::col(BookingCol::Id).count(), "total")
        .filter(BookingCol::TutorId.eq(user.user_id))
        .group_by(BookingCol::Status)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut stats = TutorStats {
        average_rating: tutor.average_rating,
        total_reviews: tutor.total_reviews,
        ..TutorStats::default()
    };
    for (status, n) in counts {
        let n = n.max(0) as u64;
        stats.total_bookings += n;
        match status {
            BookingStatus::Pending => stats.pending_bookings = n,
            BookingStatus::Confirmed => stats.confirmed_bookings = n,
            BookingStatus::Completed => stats.completed_bookings = n,
            BookingStatus::Cancelled => stats.cancelled_bookings = n,
            BookingStatus::Rejected => stats.rejected_bookings = n,
        }
    }

    Ok(ApiResponse::success("Tutor stats", stats, Some(Meta::empty())))
}

pub async fn list_schedules(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ScheduleList>> {
    ensure_role(user, Role::Tutor)?;
    let items = TutorSchedules::find()
        .filter(ScheduleCol::TutorId.eq(user.user_id))
        .order_by_asc(ScheduleCol::StartTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(models::TutorSchedule::from)
        .collect();

    Ok(ApiResponse::success(
        "Schedules",
        ScheduleList { items },
        Some(Meta::empty()),
    ))
}

pub async fn add_schedule(
    state: &AppState,
    user: &AuthUser,
    payload: CreateScheduleRequest,
) -> AppResult<ApiResponse<models::TutorSchedule>> {
    ensure_role(user, Role::Tutor)?;
    if payload.start_time >= payload.end_time {
        return Err(AppError::BadRequest(
            "start_time must be before end_time".into(),
        ));
    }

    let same_day = TutorSchedules::find()
        .filter(ScheduleCol::TutorId.eq(user.user_id))
        .filter(ScheduleCol::DayOfWeek.eq(payload.day_of_week))
        .all(&state.orm)
        .await?;
    let slot = (payload.start_time, payload.end_time);
    if same_day
        .iter()
        .any(|s| slots_overlap(slot, (s.start_time, s.end_time)))
    {
        return Err(AppError::Conflict(
            "schedule overlaps an existing slot".into(),
        ));
    }

    let schedule = tutor_schedules::ActiveModel {
        id: Set(Uuid::new_v4()),
        tutor_id: Set(user.user_id),
        day_of_week: Set(payload.day_of_week),
        start_time: Set(payload.start_time),
        end_time: Set(payload.end_time),
        available: Set(payload.available.unwrap_or(true)),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Schedule added",
        models::TutorSchedule::from(schedule),
        Some(Meta::empty()),
    ))
}

pub async fn delete_schedule(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_role(user, Role::Tutor)?;
    let schedule = match TutorSchedules::find_by_id(id).one(&state.orm).await? {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    if schedule.tutor_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    TutorSchedules::delete_by_id(id).exec(&state.orm).await?;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_expertise(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ExpertiseList>> {
    ensure_role(user, Role::Tutor)?;
    let items = TutorExpertise::find()
        .filter(ExpertiseCol::TutorId.eq(user.user_id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(models::TutorExpertise::from)
        .collect();

    Ok(ApiResponse::success(
        "Expertise",
        ExpertiseList { items },
        Some(Meta::empty()),
    ))
}

pub async fn add_expertise(
    state: &AppState,
    user: &AuthUser,
    payload: CreateExpertiseRequest,
) -> AppResult<ApiResponse<models::TutorExpertise>> {
    ensure_role(user, Role::Tutor)?;
    payload.validate()?;

    let expertise = tutor_expertise::ActiveModel {
        id: Set(Uuid::new_v4()),
        tutor_id: Set(user.user_id),
        title: Set(payload.title),
        description: Set(payload.description),
        institution: Set(payload.institution),
        year_obtained: Set(payload.year_obtained),
        certificate_url: Set(payload.certificate_url),
        verified: Set(false),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Expertise added",
        models::TutorExpertise::from(expertise),
        Some(Meta::empty()),
    ))
}

pub async fn add_subject(
    state: &AppState,
    user: &AuthUser,
    payload: SubjectRefRequest,
) -> AppResult<ApiResponse<SubjectList>> {
    ensure_role(user, Role::Tutor)?;
    if Subjects::find_by_id(payload.subject_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    TutorSubjects::insert(tutor_subjects::ActiveModel {
        tutor_id: Set(user.user_id),
        subject_id: Set(payload.subject_id),
    })
    .on_conflict(
        OnConflict::columns([TutorSubjectCol::TutorId, TutorSubjectCol::SubjectId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    let items = subjects_of(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "Subjects",
        SubjectList { items },
        Some(Meta::empty()),
    ))
}

pub async fn remove_subject(
    state: &AppState,
    user: &AuthUser,
    subject_id: Uuid,
) -> AppResult<ApiResponse<SubjectList>> {
    ensure_role(user, Role::Tutor)?;
    TutorSubjects::delete_many()
        .filter(TutorSubjectCol::TutorId.eq(user.user_id))
        .filter(TutorSubjectCol::SubjectId.eq(subject_id))
        .exec(&state.orm)
        .await?;

    let items = subjects_of(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "Subjects",
        SubjectList { items },
        Some(Meta::empty()),
    ))
}

async fn subjects_of(state: &AppState, tutor_id: Uuid) -> AppResult<Vec<Subject>> {
    let ids: Vec<Uuid> = TutorSubjects::find()
        .select_only()
        .column(TutorSubjectCol::SubjectId)
        .filter(TutorSubjectCol::TutorId.eq(tutor_id))
        .into_tuple()
        .all(&state.orm)
        .await?;

    Ok(Subjects::find()
        .filter(SubjectCol::Id.is_in(ids))
        .order_by_asc(SubjectCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Subject::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn disjoint_slots_do_not_overlap() {
        assert!(!slots_overlap((t(9, 0), t(10, 0)), (t(11, 0), t(12, 0))));
        assert!(!slots_overlap((t(14, 0), t(15, 0)), (t(9, 0), t(10, 0))));
    }

    #[test]
    fn nested_and_partial_slots_overlap() {
        assert!(slots_overlap((t(9, 0), t(12, 0)), (t(10, 0), t(11, 0))));
        assert!(slots_overlap((t(9, 0), t(10, 30)), (t(10, 0), t(11, 0))));
    }

    #[test]
    fn touching_edges_count_as_overlap() {
        assert!(slots_overlap((t(9, 0), t(10, 0)), (t(10, 0), t(11, 0))));
    }
}
