mod common;

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tutorconnect_api::{
    dto::{
        bookings::CreateBookingRequest,
        chat::{OpenChatRoomRequest, SendMessageRequest},
        reviews::CreateReviewRequest,
    },
    entity::{
        chat_rooms::Entity as ChatRooms,
        messages::{Column as MessageCol, Entity as Messages},
        tutors::Entity as Tutors,
    },
    error::AppError,
    services::{booking_service, chat_service, review_service},
};

const SENDS_PER_ROUND: usize = 4;

// Parallel writers to one chat room or one booking's review slot are
// serialized: the room keeps its latest timestamp and a booking gets one review.
#[tokio::test]
async fn parallel_writers_are_serialized() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let student = common::student(&state, "Nina").await?;
    let tutor = common::tutor(&state, "Theo").await?;
    let subject_id = common::subject(&state, "Chemistry").await?;

    let room = chat_service::get_or_create_room(
        &state,
        &student,
        OpenChatRoomRequest {
            participant_id: tutor.user_id,
        },
    )
    .await?
    .data
    .unwrap();
    let room_id = room.id;

    for round in 0..10 {
        let mut handles = Vec::new();
        for i in 0..SENDS_PER_ROUND {
            let state = state.clone();
            let sender = if i % 2 == 0 { student.clone() } else { tutor.clone() };
            let content = format!("round {round} message {i}");
            handles.push(tokio::spawn(async move {
                chat_service::send_message(&state, &sender, room_id, SendMessageRequest { content })
                    .await
            }));
        }
        for handle in handles {
            handle.await??;
        }

        let stored = ChatRooms::find_by_id(room_id)
            .one(&state.orm)
            .await?
            .expect("room row");
        let latest = Messages::find()
            .filter(MessageCol::ChatRoomId.eq(room_id))
            .order_by_desc(MessageCol::SentAt)
            .one(&state.orm)
            .await?
            .expect("at least one message");
        assert_eq!(stored.last_message_at, Some(latest.sent_at), "round {round}");
    }

    let rounds = 5;
    for round in 0..rounds {
        let start = Utc::now() + Duration::days(round + 1);
        let booking = booking_service::create_booking(
            &state,
            &student,
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

        let mut handles = Vec::new();
        for rating in [4, 5] {
            let state = state.clone();
            let student = student.clone();
            let payload = CreateReviewRequest {
                tutor_id: tutor.user_id,
                booking_id: Some(booking.id),
                rating,
                comment: None,
            };
            handles.push(tokio::spawn(async move {
                review_service::create_review(&state, &student, payload).await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await? {
                Ok(_) => created += 1,
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("round {round}: unexpected error {other}"),
            }
        }
        assert_eq!((created, conflicts), (1, 1), "round {round}");
    }

    let tutor_row = Tutors::find_by_id(tutor.user_id)
        .one(&state.orm)
        .await?
        .expect("tutor row");
    assert_eq!(tutor_row.total_reviews, rounds as i32);

    Ok(())
}
