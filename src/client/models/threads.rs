use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::error::{ChatError, ChatResult};
use crate::client::models::messages::{Message, ThreadId, UserId};
use crate::client::models::wire;

/// Every thread is bound to a marketplace context, never free-form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadType {
    Booking,
    Ride,
    Inquiry,
    Dispute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    #[default]
    Open,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(deserialize_with = "wire::flexible_id")]
    pub id: ThreadId,
    #[serde(rename = "type", alias = "thread_type")]
    pub thread_type: ThreadType,
    #[serde(default)]
    pub status: ThreadStatus,
    #[serde(default)]
    pub participants: Vec<UserId>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default = "Utc::now", deserialize_with = "wire::timestamp_or_now")]
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// A usable thread has at least two distinct participants.
    pub fn validate(&self) -> ChatResult<()> {
        let distinct: HashSet<&str> = self.participants.iter().map(String::as_str).collect();
        if distinct.len() < 2 {
            return Err(ChatError::InvalidThread(format!(
                "thread {} has {} distinct participant(s)",
                self.id,
                distinct.len()
            )));
        }
        Ok(())
    }

    pub fn accepts_sends(&self) -> bool {
        self.status == ThreadStatus::Open
    }
}

/// Row of the thread list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    #[serde(deserialize_with = "wire::flexible_id")]
    pub id: ThreadId,
    #[serde(rename = "type", alias = "thread_type")]
    pub thread_type: ThreadType,
    #[serde(default)]
    pub status: ThreadStatus,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub participants: Vec<UserId>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default = "Utc::now", deserialize_with = "wire::timestamp_or_now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message: Option<Message>,
}

impl From<&Thread> for ThreadSummary {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id.clone(),
            thread_type: thread.thread_type,
            status: thread.status,
            subject: thread.subject.clone(),
            participants: thread.participants.clone(),
            message_count: thread.message_count,
            unread_count: thread.unread_count,
            updated_at: thread.updated_at,
            last_message: None,
        }
    }
}

/// Body of `POST /threads/create_contextual`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextRef {
    pub context_type: ThreadType,
    pub context_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}
