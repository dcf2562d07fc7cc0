use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType, NullOrdering, OnConflict, Order};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        chat::{ChatRoomList, ChatRoomSummary, MessageList, OpenChatRoomRequest, SendMessageRequest},
        notifications::{CountData, UpdatedData},
    },
    entity::{
        chat_rooms::{ActiveModel as RoomActive, Column as RoomCol, Entity as ChatRooms, Model as RoomModel},
        enums::{NotificationType, Role},
        messages::{self, ActiveModel as MessageActive, Column as MessageCol, Entity as Messages},
        students::Entity as Students,
        tutors::Entity as Tutors,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ChatRoom, Message},
    response::{ApiResponse, Meta},
    services::{
        notification_service::{self, NewNotification},
        user_service::load_user,
    },
    state::AppState,
};

/// Return the room for this student/tutor pair, creating it on first use.
///
/// Concurrent first calls race on the unique `(student_id, tutor_id)` index;
/// the loser's insert is a no-op and both read back the same row.
pub async fn get_or_create_room(
    state: &AppState,
    user: &AuthUser,
    payload: OpenChatRoomRequest,
) -> AppResult<ApiResponse<ChatRoom>> {
    let (student_id, tutor_id) = match user.role {
        Role::Student => (user.user_id, payload.participant_id),
        Role::Tutor => (payload.participant_id, user.user_id),
        Role::Admin => return Err(AppError::Forbidden),
    };

    if Students::find_by_id(student_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    if Tutors::find_by_id(tutor_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let candidate = RoomActive {
        id: Set(Uuid::new_v4()),
        student_id: Set(student_id),
        tutor_id: Set(tutor_id),
        created_at: Set(Utc::now().into()),
        last_message_at: Set(None),
    };
    ChatRooms::insert(candidate)
        .on_conflict(
            OnConflict::columns([RoomCol::StudentId, RoomCol::TutorId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&state.orm)
        .await?;

    let room = ChatRooms::find()
        .filter(RoomCol::StudentId.eq(student_id))
        .filter(RoomCol::TutorId.eq(tutor_id))
        .one(&state.orm)
        .await?;
    let room = match room {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Chat room",
        ChatRoom::from(room),
        Some(Meta::empty()),
    ))
}

/// The caller's rooms, most recently active first, each with its unread count.
pub async fn list_rooms(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ChatRoomList>> {
    let rooms = ChatRooms::find()
        .filter(participant_of(user.user_id))
        .order_by_with_nulls(RoomCol::LastMessageAt, Order::Desc, NullOrdering::Last)
        .order_by_desc(RoomCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let room_ids: Vec<Uuid> = rooms.iter().map(|r| r.id).collect();
    let counts: HashMap<Uuid, i64> = if room_ids.is_empty() {
        HashMap::new()
    } else {
        Messages::find()
            .select_only()
            .column(MessageCol::ChatRoomId)
            .column_as(Expr::col(MessageCol::Id).count(), "unread")
            .filter(MessageCol::ChatRoomId.is_in(room_ids))
            .filter(MessageCol::SenderId.ne(user.user_id))
            .filter(MessageCol::IsRead.eq(false))
            .group_by(MessageCol::ChatRoomId)
            .into_tuple::<(Uuid, i64)>()
            .all(&state.orm)
            .await?
            .into_iter()
            .collect()
    };

    let items = rooms
        .into_iter()
        .map(|room| {
            let unread = counts.get(&room.id).copied().unwrap_or(0);
            ChatRoomSummary {
                room: ChatRoom::from(room),
                unread_count: unread.max(0) as u64,
            }
        })
        .collect();

    Ok(ApiResponse::success(
        "Chat rooms",
        ChatRoomList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_room(state: &AppState, user: &AuthUser, room_id: Uuid) -> AppResult<ApiResponse<ChatRoom>> {
    let room = find_joined_room(state, user, room_id).await?;
    Ok(ApiResponse::success(
        "Chat room",
        ChatRoom::from(room),
        Some(Meta::empty()),
    ))
}

/// Messages of a room, oldest first.
pub async fn list_messages(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
) -> AppResult<ApiResponse<MessageList>> {
    let room = find_joined_room(state, user, room_id).await?;

    let items = Messages::find()
        .filter(MessageCol::ChatRoomId.eq(room.id))
        .order_by_asc(MessageCol::SentAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();

    Ok(ApiResponse::success(
        "Messages",
        MessageList { items },
        Some(Meta::empty()),
    ))
}

pub async fn send_message(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
    payload: SendMessageRequest,
) -> AppResult<ApiResponse<Message>> {
    payload.validate()?;

    let txn = state.orm.begin().await?;

    // Senders in one room queue on this lock, so `last_message_at` only moves forward.
    let room = ChatRooms::find_by_id(room_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let room = match room {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if !room.has_participant(user.user_id) {
        return Err(AppError::Forbidden);
    }

    let sent_at = Utc::now();
    let message = MessageActive {
        id: Set(Uuid::new_v4()),
        chat_room_id: Set(room.id),
        sender_id: Set(user.user_id),
        content: Set(payload.content),
        sent_at: Set(sent_at.into()),
        read_at: Set(None),
        is_read: Set(false),
    }
    .insert(&txn)
    .await?;

    let recipient = room.counterpart(user.user_id);
    let mut active: RoomActive = room.into();
    active.last_message_at = Set(Some(sent_at.into()));
    let room = active.update(&txn).await?;

    let sender = load_user(&txn, user.user_id).await?;
    notification_service::dispatch(
        &txn,
        NewNotification {
            recipient,
            title: "New Message".into(),
            message: format!("You have a new message from {}", sender.full_name()),
            notification_type: NotificationType::NewMessage,
            link: Some(format!("/messages/chat/{}", room.id)),
        },
    )
    .await?;

    txn.commit().await?;

    tracing::debug!(room_id = %room.id, message_id = %message.id, "message sent");

    Ok(ApiResponse::success(
        "Message sent",
        Message::from(message),
        Some(Meta::empty()),
    ))
}

/// Mark every message the other side sent in this room as read. Running it
/// twice changes nothing the second time.
pub async fn mark_messages_as_read(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
) -> AppResult<ApiResponse<UpdatedData>> {
    let room = find_joined_room(state, user, room_id).await?;

    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let result = Messages::update_many()
        .col_expr(MessageCol::IsRead, Expr::value(true))
        .col_expr(MessageCol::ReadAt, Expr::value(now))
        .filter(MessageCol::ChatRoomId.eq(room.id))
        .filter(MessageCol::SenderId.ne(user.user_id))
        .filter(MessageCol::IsRead.eq(false))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Messages read",
        UpdatedData {
            updated: result.rows_affected,
        },
        Some(Meta::empty()),
    ))
}

/// Unread messages addressed to the caller across all rooms.
pub async fn unread_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CountData>> {
    let count = Messages::find()
        .join(JoinType::InnerJoin, messages::Relation::ChatRooms.def())
        .filter(participant_of(user.user_id))
        .filter(MessageCol::SenderId.ne(user.user_id))
        .filter(MessageCol::IsRead.eq(false))
        .count(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Unread count",
        CountData { count },
        Some(Meta::empty()),
    ))
}

async fn find_joined_room(state: &AppState, user: &AuthUser, room_id: Uuid) -> AppResult<RoomModel> {
    let room = match ChatRooms::find_by_id(room_id).one(&state.orm).await? {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if !room.has_participant(user.user_id) {
        return Err(AppError::Forbidden);
    }
    Ok(room)
}

fn participant_of(user_id: Uuid) -> Condition {
    Condition::any()
        .add(RoomCol::StudentId.eq(user_id))
        .add(RoomCol::TutorId.eq(user_id))
}
