use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::models::messages::ThreadId;
use crate::client::models::wire;

pub type NotificationId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Message,
    Booking,
    Ride,
    Payment,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Unread,
    Read,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(deserialize_with = "wire::flexible_id")]
    pub id: NotificationId,
    #[serde(alias = "type", alias = "notification_type")]
    pub category: NotificationCategory,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "message")]
    pub body: String,
    #[serde(default)]
    pub status: NotificationStatus,
    #[serde(default = "Utc::now", deserialize_with = "wire::timestamp_or_now")]
    pub created_at: DateTime<Utc>,
    /// Opaque payload used for deep-link routing.
    #[serde(default)]
    pub data: Value,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        self.data.get("thread_id").and_then(wire::id_from_value)
    }
}
