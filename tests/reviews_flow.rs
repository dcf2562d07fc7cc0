mod common;

use chrono::{Duration, NaiveTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tutorconnect_api::{
    dto::{
        bookings::CreateBookingRequest,
        chat::{OpenChatRoomRequest, SendMessageRequest},
        reviews::{CreateReviewRequest, UpdateReviewRequest},
        tutors::{CreateExpertiseRequest, CreateScheduleRequest},
        users::SubjectRefRequest,
    },
    entity::{
        enums::DayOfWeek,
        tutor_expertise::{Column as ExpertiseCol, Entity as TutorExpertise},
        tutor_schedules::{Column as ScheduleCol, Entity as TutorSchedules},
        tutor_subjects::{Column as TutorSubjectCol, Entity as TutorSubjects},
        tutors::Entity as Tutors,
    },
    error::AppError,
    services::{admin_service, booking_service, chat_service, review_service, subject_service, tutor_service},
    state::AppState,
};
use uuid::Uuid;

async fn rating_of(state: &AppState, tutor_id: Uuid) -> anyhow::Result<(f64, i32)> {
    let tutor = Tutors::find_by_id(tutor_id)
        .one(&state.orm)
        .await?
        .expect("tutor row");
    Ok((tutor.average_rating, tutor.total_reviews))
}

// Reviews keep the tutor aggregate equal to the mean of the live reviews,
// including when the author account is deleted.
#[tokio::test]
async fn review_changes_keep_tutor_rating_in_sync() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let alice = common::student(&state, "Alice").await?;
    let bob = common::student(&state, "Bob").await?;
    let tutor = common::tutor(&state, "Tom").await?;
    let admin = common::admin(&state).await?;
    let subject_id = common::subject(&state, "Physics").await?;

    let start = Utc::now() + Duration::days(1);
    let booking = booking_service::create_booking(
        &state,
        &alice,
        CreateBookingRequest {
            tutor_id: tutor.user_id,
            subject_id,
            start_time: start,
            end_time: start + Duration::hours(1),
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();

    let first = review_service::create_review(
        &state,
        &alice,
        CreateReviewRequest {
            tutor_id: tutor.user_id,
            booking_id: Some(booking.id),
            rating: 5,
            comment: Some("Great".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(rating_of(&state, tutor.user_id).await?, (5.0, 1));

    // One review per booking.
    let duplicate = review_service::create_review(
        &state,
        &alice,
        CreateReviewRequest {
            tutor_id: tutor.user_id,
            booking_id: Some(booking.id),
            rating: 1,
            comment: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    assert_eq!(rating_of(&state, tutor.user_id).await?, (5.0, 1));

    // Someone else's booking cannot be reviewed.
    let foreign = review_service::create_review(
        &state,
        &bob,
        CreateReviewRequest {
            tutor_id: tutor.user_id,
            booking_id: Some(booking.id),
            rating: 2,
            comment: None,
        },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::BadRequest(_))));

    let out_of_range = review_service::create_review(
        &state,
        &bob,
        CreateReviewRequest {
            tutor_id: tutor.user_id,
            booking_id: None,
            rating: 6,
            comment: None,
        },
    )
    .await;
    assert!(matches!(out_of_range, Err(AppError::Validation(_))));

    review_service::create_review(
        &state,
        &bob,
        CreateReviewRequest {
            tutor_id: tutor.user_id,
            booking_id: None,
            rating: 3,
            comment: None,
        },
    )
    .await?;
    assert_eq!(rating_of(&state, tutor.user_id).await?, (4.0, 2));

    // Only the author may edit.
    let hijack = review_service::update_review(
        &state,
        &bob,
        first.id,
        UpdateReviewRequest {
            rating: 1,
            comment: None,
        },
    )
    .await;
    assert!(matches!(hijack, Err(AppError::Forbidden)));

    review_service::update_review(
        &state,
        &alice,
        first.id,
        UpdateReviewRequest {
            rating: 1,
            comment: Some("Changed my mind".into()),
        },
    )
    .await?;
    assert_eq!(rating_of(&state, tutor.user_id).await?, (2.0, 2));

    let by_booking = review_service::get_for_booking(&state, booking.id).await?.data.unwrap();
    assert_eq!(by_booking.id, first.id);

    // Deleting Alice removes her review from the aggregate along with her bookings.
    admin_service::delete_user(&state, &admin, alice.user_id).await?;
    assert_eq!(rating_of(&state, tutor.user_id).await?, (3.0, 1));

    let remaining = review_service::list_for_tutor(&state, tutor.user_id).await?.data.unwrap();
    assert_eq!(remaining.items.len(), 1);

    let gone = booking_service::get_booking(&state, &admin, booking.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    // A subject with bookings cannot be removed.
    let kept = booking_service::create_booking(
        &state,
        &bob,
        CreateBookingRequest {
            tutor_id: tutor.user_id,
            subject_id,
            start_time: start,
            end_time: start + Duration::hours(1),
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();
    let in_use = subject_service::delete_subject(&state, &admin, subject_id).await;
    assert!(matches!(in_use, Err(AppError::Conflict(_))));

    // Give the tutor one of everything, then delete the account.
    tutor_service::add_subject(&state, &tutor, SubjectRefRequest { subject_id }).await?;
    tutor_service::add_schedule(
        &state,
        &tutor,
        CreateScheduleRequest {
            day_of_week: DayOfWeek::Monday,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            available: None,
        },
    )
    .await?;
    tutor_service::add_expertise(
        &state,
        &tutor,
        CreateExpertiseRequest {
            title: "MSc Physics".into(),
            description: "Graduate degree".into(),
            institution: None,
            year_obtained: Some(2019),
            certificate_url: None,
        },
    )
    .await?;
    let room = chat_service::get_or_create_room(
        &state,
        &bob,
        OpenChatRoomRequest {
            participant_id: tutor.user_id,
        },
    )
    .await?
    .data
    .unwrap();
    chat_service::send_message(
        &state,
        &bob,
        room.id,
        SendMessageRequest {
            content: "See you Monday".into(),
        },
    )
    .await?;

    admin_service::delete_user(&state, &admin, tutor.user_id).await?;

    assert!(Tutors::find_by_id(tutor.user_id).one(&state.orm).await?.is_none());
    assert!(review_service::list_mine(&state, &bob).await?.data.unwrap().items.is_empty());
    let bob_bookings = booking_service::list_for_student(&state, &bob).await?.data.unwrap();
    assert!(bob_bookings.items.iter().all(|b| b.id != kept.id));
    assert!(chat_service::list_rooms(&state, &bob).await?.data.unwrap().items.is_empty());
    let schedules = TutorSchedules::find()
        .filter(ScheduleCol::TutorId.eq(tutor.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(schedules, 0);
    let expertise = TutorExpertise::find()
        .filter(ExpertiseCol::TutorId.eq(tutor.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(expertise, 0);
    let links = TutorSubjects::find()
        .filter(TutorSubjectCol::TutorId.eq(tutor.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(links, 0);

    // With the bookings gone the subject can go too.
    subject_service::delete_subject(&state, &admin, subject_id).await?;

    Ok(())
}
