use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{ChatRoom, Message};

/// `participant_id` is the other side: a tutor when a student opens the
/// room, a student when a tutor does.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenChatRoomRequest {
    pub participant_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatRoomSummary {
    pub room: ChatRoom,
    pub unread_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatRoomList {
    pub items: Vec<ChatRoomSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageList {
    pub items: Vec<Message>,
}
