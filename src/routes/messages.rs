use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        chat::{ChatRoomList, MessageList, OpenChatRoomRequest, SendMessageRequest},
        notifications::{CountData, UpdatedData},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{ChatRoom, Message},
    response::ApiResponse,
    services::chat_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chatrooms", get(list_rooms).post(open_room))
        .route("/chatrooms/{id}", get(get_room))
        .route("/chatrooms/{id}/messages", get(list_messages).post(send_message))
        .route("/chatrooms/{id}/read", post(mark_read))
        .route("/unread/count", get(unread_count))
}

#[utoipa::path(
    get,
    path = "/api/messages/chatrooms",
    responses(
        (status = 200, description = "Caller's rooms with unread counts", body = ApiResponse<ChatRoomList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Messages"
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ChatRoomList>>> {
    let resp = chat_service::list_rooms(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/messages/chatrooms",
    request_body = OpenChatRoomRequest,
    responses(
        (status = 200, description = "Existing or new room for the pair", body = ApiResponse<ChatRoom>),
        (status = 400, description = "Unknown counterpart"),
        (status = 403, description = "Admins cannot open rooms")
    ),
    security(("bearer_auth" = [])),
    tag = "Messages"
)]
pub async fn open_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<OpenChatRoomRequest>,
) -> AppResult<Json<ApiResponse<ChatRoom>>> {
    let resp = chat_service::get_or_create_room(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/messages/chatrooms/{id}",
    params(("id" = Uuid, Path, description = "Chat room ID")),
    responses(
        (status = 200, description = "Room", body = ApiResponse<ChatRoom>),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Messages"
)]
pub async fn get_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ChatRoom>>> {
    let resp = chat_service::get_room(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/messages/chatrooms/{id}/messages",
    params(("id" = Uuid, Path, description = "Chat room ID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = ApiResponse<MessageList>),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Messages"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageList>>> {
    let resp = chat_service::list_messages(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/messages/chatrooms/{id}/messages",
    params(("id" = Uuid, Path, description = "Chat room ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message sent; recipient notified", body = ApiResponse<Message>),
        (status = 403, description = "Not a participant"),
        (status = 422, description = "Content empty or over 2000 characters")
    ),
    security(("bearer_auth" = [])),
    tag = "Messages"
)]
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let resp = chat_service::send_message(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/messages/chatrooms/{id}/read",
    params(("id" = Uuid, Path, description = "Chat room ID")),
    responses(
        (status = 200, description = "Messages from the other side marked read", body = ApiResponse<UpdatedData>),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = [])),
    tag = "Messages"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UpdatedData>>> {
    let resp = chat_service::mark_messages_as_read(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/messages/unread/count",
    responses(
        (status = 200, description = "Unread messages across all rooms", body = ApiResponse<CountData>)
    ),
    security(("bearer_auth" = [])),
    tag = "Messages"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CountData>>> {
    let resp = chat_service::unread_count(&state, &user).await?;
    Ok(Json(resp))
}
