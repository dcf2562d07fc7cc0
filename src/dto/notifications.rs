use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Notification;

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub items: Vec<Notification>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CountData {
    pub count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdatedData {
    pub updated: u64,
}
