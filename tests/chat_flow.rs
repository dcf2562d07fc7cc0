mod common;

use tutorconnect_api::{
    dto::chat::{OpenChatRoomRequest, SendMessageRequest},
    entity::enums::NotificationType,
    error::AppError,
    services::{chat_service, notification_service},
};

#[tokio::test]
async fn chat_room_messages_and_unread_counts() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let student = common::student(&state, "Sara").await?;
    let tutor = common::tutor(&state, "Theo").await?;
    let stranger = common::student(&state, "Steve").await?;

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

    // Opening from the other side returns the same room.
    let same = chat_service::get_or_create_room(
        &state,
        &tutor,
        OpenChatRoomRequest {
            participant_id: student.user_id,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(room.id, same.id);

    for text in ["hello", "are you free on friday?", "thanks"] {
        chat_service::send_message(
            &state,
            &student,
            room.id,
            SendMessageRequest {
                content: text.into(),
            },
        )
        .await?;
    }
    chat_service::send_message(
        &state,
        &tutor,
        room.id,
        SendMessageRequest {
            content: "yes, 4pm works".into(),
        },
    )
    .await?;

    let empty = chat_service::send_message(
        &state,
        &student,
        room.id,
        SendMessageRequest {
            content: String::new(),
        },
    )
    .await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let intruder = chat_service::send_message(
        &state,
        &stranger,
        room.id,
        SendMessageRequest {
            content: "hi".into(),
        },
    )
    .await;
    assert!(matches!(intruder, Err(AppError::Forbidden)));

    let messages = chat_service::list_messages(&state, &tutor, room.id).await?.data.unwrap();
    let contents: Vec<&str> = messages.items.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["hello", "are you free on friday?", "thanks", "yes, 4pm works"]
    );

    let tutor_unread = chat_service::unread_count(&state, &tutor).await?.data.unwrap();
    assert_eq!(tutor_unread.count, 3);
    let student_unread = chat_service::unread_count(&state, &student).await?.data.unwrap();
    assert_eq!(student_unread.count, 1);

    let rooms = chat_service::list_rooms(&state, &tutor).await?.data.unwrap();
    assert_eq!(rooms.items.len(), 1);
    assert_eq!(rooms.items[0].unread_count, 3);
    assert!(rooms.items[0].room.last_message_at.is_some());

    let marked = chat_service::mark_messages_as_read(&state, &tutor, room.id).await?.data.unwrap();
    assert_eq!(marked.updated, 3);
    let again = chat_service::mark_messages_as_read(&state, &tutor, room.id).await?.data.unwrap();
    assert_eq!(again.updated, 0);
    assert_eq!(chat_service::unread_count(&state, &tutor).await?.data.unwrap().count, 0);
    // The student's unread message is untouched.
    assert_eq!(chat_service::unread_count(&state, &student).await?.data.unwrap().count, 1);

    let inbox = notification_service::list_notifications(&state, &tutor).await?.data.unwrap();
    assert_eq!(inbox.items.len(), 3);
    assert!(inbox.items.iter().all(|n| n.notification_type == NotificationType::NewMessage
        && n.message == "You have a new message from Sara Student"
        && n.link.as_deref() == Some(format!("/messages/chat/{}", room.id).as_str())));

    // Notifications of another user look missing.
    let foreign = notification_service::mark_as_read(&state, &stranger, inbox.items[0].id).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    Ok(())
}
