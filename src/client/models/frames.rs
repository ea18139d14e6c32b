use serde::{Deserialize, Serialize};

use crate::client::models::messages::{MessageId, ThreadId, UserId};
use crate::client::models::wire;

// Frame types on the wire: {"type": "...", "data": {...}}
pub const NEW_MESSAGE: &str = "new_message";
pub const TYPING: &str = "typing";
pub const READ: &str = "read";
pub const NOTIFICATION: &str = "notification";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypingPayload {
    #[serde(alias = "user", deserialize_with = "wire::flexible_id")]
    pub user_id: UserId,
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default, alias = "thread", deserialize_with = "wire::flexible_id")]
    pub thread_id: ThreadId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReadPayload {
    #[serde(alias = "user", alias = "user_id", deserialize_with = "wire::flexible_id")]
    pub reader: UserId,
    #[serde(default)]
    pub message_ids: Vec<MessageId>,
    #[serde(default, alias = "thread", deserialize_with = "wire::flexible_id")]
    pub thread_id: ThreadId,
}

/// Frames the client writes to a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Message { message: String },
    Typing { is_typing: bool },
    ReadReceipt { message_ids: Vec<MessageId> },
}

impl OutboundFrame {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_value(frame: &OutboundFrame) -> Value {
        serde_json::from_str(&frame.to_json().unwrap()).unwrap()
    }

    #[test]
    fn outbound_shapes_match_the_wire_contract() {
        assert_eq!(
            as_value(&OutboundFrame::Message { message: "ciao".into() }),
            json!({"type": "message", "message": "ciao"})
        );
        assert_eq!(
            as_value(&OutboundFrame::Typing { is_typing: true }),
            json!({"type": "typing", "is_typing": true})
        );
        assert_eq!(
            as_value(&OutboundFrame::ReadReceipt { message_ids: vec!["m1".into(), "m2".into()] }),
            json!({"type": "read_receipt", "message_ids": ["m1", "m2"]})
        );
    }

    #[test]
    fn read_payload_takes_user_alias() {
        let p: ReadPayload =
            serde_json::from_value(json!({"user": 7, "message_ids": ["a"]})).unwrap();
        assert_eq!(p.reader, "7");
        assert_eq!(p.thread_id, "");
    }
}
