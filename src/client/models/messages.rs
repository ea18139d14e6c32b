use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::models::wire;

pub type ThreadId = String;
pub type MessageId = String;
pub type UserId = String;

/// Prefix that marks a locally generated, not yet confirmed message id.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sending,
    #[default]
    Sent,
    Delivered,
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(deserialize_with = "wire::flexible_id")]
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "wire::flexible_id")]
    pub id: MessageId,
    /// Empty when the frame did not carry it; the router fills it from the channel.
    #[serde(default, alias = "thread", deserialize_with = "wire::flexible_id")]
    pub thread_id: ThreadId,
    #[serde(alias = "sender_id", deserialize_with = "wire::flexible_id")]
    pub sender: UserId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default = "Utc::now", deserialize_with = "wire::timestamp_or_now")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Builds the local stand-in shown while a send is in flight.
    pub fn placeholder(thread_id: &str, sender: &str, draft: MessageDraft) -> Self {
        Self {
            id: format!("{}{}", PLACEHOLDER_PREFIX, uuid::Uuid::new_v4()),
            thread_id: thread_id.to_string(),
            sender: sender.to_string(),
            content: draft.content,
            attachments: draft.attachments,
            status: MessageStatus::Sending,
            created_at: draft.created_at.unwrap_or_else(Utc::now),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender == user_id
    }
}

/// What the composer hands to the store before the server has seen it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageDraft {
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub created_at: Option<DateTime<Utc>>,
}

impl MessageDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Sort by `created_at` ascending. `sort_by_key` is stable, so equal
/// timestamps keep their insertion order.
pub fn sort_chronologically(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.created_at);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn placeholder_is_marked_and_stamped() {
        let msg = Message::placeholder("t1", "me", MessageDraft::text("hi"));
        assert!(msg.is_placeholder());
        assert_eq!(msg.status, MessageStatus::Sending);
        assert_eq!(msg.thread_id, "t1");
        assert!(msg.is_from("me"));
    }

    #[test]
    fn placeholder_keeps_draft_timestamp() {
        let at = Utc.timestamp_opt(42, 0).unwrap();
        let draft = MessageDraft {
            created_at: Some(at),
            ..MessageDraft::text("x")
        };
        assert_eq!(Message::placeholder("t1", "me", draft).created_at, at);
    }

    #[test]
    fn deserializes_loose_server_payload() {
        let raw = r#"{"id": 17, "thread": {"id": 4}, "sender": {"id": 9, "username": "ann"},
                      "content": "yo", "created_at": 1700000000}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.id, "17");
        assert_eq!(msg.thread_id, "4");
        assert_eq!(msg.sender, "9");
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn missing_or_broken_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let missing: Message = serde_json::from_str(r#"{"id":"a","sender":"u"}"#).unwrap();
        let null: Message =
            serde_json::from_str(r#"{"id":"b","sender":"u","created_at":null}"#).unwrap();
        let garbage: Message =
            serde_json::from_str(r#"{"id":"c","sender":"u","created_at":"yesterday"}"#).unwrap();
        for msg in [missing, null, garbage] {
            assert!(msg.created_at >= before);
        }
    }

    #[test]
    fn chronological_sort_is_stable_on_ties() {
        let at = Utc.timestamp_opt(10, 0).unwrap();
        let mk = |id: &str, secs: i64| Message {
            id: id.to_string(),
            thread_id: "t".into(),
            sender: "u".into(),
            content: String::new(),
            attachments: vec![],
            status: MessageStatus::Sent,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        };
        let mut list = vec![mk("late", 20), mk("a", 10), mk("b", 10)];
        sort_chronologically(&mut list);
        let ids: Vec<_> = list.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "late"]);
        assert_eq!(list[0].created_at, at);
    }
}
