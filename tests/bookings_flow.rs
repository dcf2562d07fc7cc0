mod common;

use chrono::{Duration, Utc};
use tutorconnect_api::{
    dto::bookings::{CreateBookingRequest, UpdateNotesRequest},
    entity::enums::{BookingStatus, NotificationType},
    error::AppError,
    middleware::auth::AuthUser,
    models::Booking,
    routes::params::BookingRangeQuery,
    services::{admin_service, booking_service, notification_service},
    state::AppState,
};
use uuid::Uuid;

// Student books, tutor confirms, student cancels; each step leaves the right
// notification behind and the status follows the action.
#[tokio::test]
async fn booking_lifecycle_notifies_the_other_side() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let student = common::student(&state, "Sam").await?;
    let outsider = common::student(&state, "Olga").await?;
    let tutor = common::tutor(&state, "Tess").await?;
    let subject_id = common::subject(&state, "Mathematics").await?;

    let start = Utc::now() + Duration::days(2);
    let created = booking_service::create_booking(
        &state,
        &student,
        CreateBookingRequest {
            tutor_id: tutor.user_id,
            subject_id,
            start_time: start,
            end_time: start + Duration::hours(1),
            notes: Some("Chapter 3".into()),
        },
    )
    .await?;
    let booking = created.data.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);

    let inbox = notification_service::list_unread(&state, &tutor).await?.data.unwrap();
    assert_eq!(inbox.items.len(), 1);
    let request = &inbox.items[0];
    assert_eq!(request.title, "New Booking Request");
    assert_eq!(request.notification_type, NotificationType::BookingRequest);
    assert_eq!(request.message, "You have a new booking request from Sam Student");
    assert_eq!(
        request.link.as_deref(),
        Some(format!("/tutor/bookings/{}", booking.id).as_str())
    );

    // Students cannot confirm.
    let denied = booking_service::confirm_booking(&state, &student, booking.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let confirmed = booking_service::confirm_booking(&state, &tutor, booking.id)
        .await?
        .data
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let student_inbox = notification_service::list_unread(&state, &student).await?.data.unwrap();
    assert_eq!(student_inbox.items.len(), 1);
    assert_eq!(student_inbox.items[0].title, "Booking Confirmed");
    assert_eq!(
        student_inbox.items[0].message,
        "Your booking with Tess Tutor has been confirmed."
    );

    let upcoming = booking_service::list_upcoming(&state, &student).await?.data.unwrap();
    assert!(upcoming.items.iter().any(|b| b.id == booking.id));

    booking_service::update_notes(
        &state,
        &student,
        booking.id,
        UpdateNotesRequest {
            notes: Some("Chapter 4 instead".into()),
        },
    )
    .await?;

    let not_mine = booking_service::cancel_booking(&state, &outsider, booking.id).await;
    assert!(matches!(not_mine, Err(AppError::Forbidden)));

    let cancelled = booking_service::cancel_booking(&state, &student, booking.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.notes.as_deref(), Some("Chapter 4 instead"));

    let tutor_inbox = notification_service::list_unread(&state, &tutor).await?.data.unwrap();
    let cancel_notice = tutor_inbox
        .items
        .iter()
        .find(|n| n.title == "Booking Cancelled")
        .expect("tutor is told about the cancellation");
    assert_eq!(cancel_notice.notification_type, NotificationType::BookingCancellation);
    assert_eq!(cancel_notice.message, "Your booking with Sam Student has been cancelled.");

    // Cancelled bookings drop out of the upcoming list.
    let upcoming = booking_service::list_upcoming(&state, &student).await?.data.unwrap();
    assert!(upcoming.items.iter().all(|b| b.id != booking.id));

    // Moving out of a terminal state is allowed and silent for completion.
    let before = notification_service::count_unread(&state, &student).await?.data.unwrap().count;
    let completed = booking_service::complete_booking(&state, &tutor, booking.id)
        .await?
        .data
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    let after = notification_service::count_unread(&state, &student).await?.data.unwrap().count;
    assert_eq!(before, after);

    let range = booking_service::list_tutor_in_range(
        &state,
        &tutor,
        BookingRangeQuery {
            from: Utc::now(),
            to: Utc::now() + Duration::days(7),
            status: Some(BookingStatus::Completed),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(range.items.len(), 1);

    let marked = notification_service::mark_all_as_read(&state, &tutor).await?.data.unwrap();
    assert_eq!(marked.updated, 2);
    let again = notification_service::mark_all_as_read(&state, &tutor).await?.data.unwrap();
    assert_eq!(again.updated, 0);

    // Only admins may delete, and the booking is gone afterwards.
    let admin = common::admin(&state).await?;
    let denied = admin_service::delete_booking(&state, &tutor, booking.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    admin_service::delete_booking(&state, &admin, booking.id).await?;
    let gone = booking_service::get_booking(&state, &student, booking.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    // Rejection lands on the student's side.
    let second = book(&state, &student, tutor.user_id, subject_id, 3).await?;
    let rejected = booking_service::reject_booking(&state, &tutor, second.id)
        .await?
        .data
        .unwrap();
    assert_eq!(rejected.status, BookingStatus::Rejected);

    let student_inbox = notification_service::list_unread(&state, &student).await?.data.unwrap();
    let reject_notice = student_inbox
        .items
        .iter()
        .find(|n| n.title == "Booking Rejected")
        .expect("student is told about the rejection");
    assert_eq!(reject_notice.notification_type, NotificationType::BookingCancellation);
    assert_eq!(reject_notice.message, "Your booking with Tess Tutor has been rejected.");
    assert_eq!(
        reject_notice.link.as_deref(),
        Some(format!("/student/bookings/{}", second.id).as_str())
    );

    // A tutor cancelling notifies the student, with a student-side link.
    let third = book(&state, &student, tutor.user_id, subject_id, 4).await?;
    booking_service::cancel_booking(&state, &tutor, third.id).await?;
    let student_inbox = notification_service::list_unread(&state, &student).await?.data.unwrap();
    let cancel_notice = student_inbox
        .items
        .iter()
        .find(|n| n.title == "Booking Cancelled")
        .expect("student is told about the cancellation");
    assert_eq!(cancel_notice.message, "Your booking with Tess Tutor has been cancelled.");
    assert_eq!(
        cancel_notice.link.as_deref(),
        Some(format!("/student/bookings/{}", third.id).as_str())
    );
    let tutor_inbox = notification_service::list_unread(&state, &tutor).await?.data.unwrap();
    assert!(tutor_inbox.items.iter().all(|n| n.title != "Booking Cancelled"));

    // Unknown references are lookup misses.
    let unknown_tutor = booking_service::create_booking(
        &state,
        &student,
        CreateBookingRequest {
            tutor_id: Uuid::new_v4(),
            subject_id,
            start_time: start,
            end_time: start + Duration::hours(1),
            notes: None,
        },
    )
    .await;
    assert!(matches!(unknown_tutor, Err(AppError::NotFound)));

    let stats = admin_service::stats(&state, &admin).await?.data.unwrap();
    assert_eq!(stats.rejected_bookings, 1);
    assert_eq!(stats.cancelled_bookings, 1);
    assert_eq!(stats.total_bookings, 2);

    Ok(())
}

async fn book(
    state: &AppState,
    student: &AuthUser,
    tutor_id: Uuid,
    subject_id: Uuid,
    days_ahead: i64,
) -> anyhow::Result<Booking> {
    let start = Utc::now() + Duration::days(days_ahead);
    let created = booking_service::create_booking(
        state,
        student,
        CreateBookingRequest {
            tutor_id,
            subject_id,
            start_time: start,
            end_time: start + Duration::hours(1),
            notes: None,
        },
    )
    .await?;
    Ok(created.data.expect("created booking"))
}
