use log::{debug, warn};
use serde_json::Value;

use crate::client::models::frames::{self, ReadPayload, TypingPayload};
use crate::client::models::messages::{Message, MessageId, ThreadId, UserId};
use crate::client::models::notifications::Notification;
use crate::client::models::wire;
use crate::client::services::connection_registry::ChannelKey;

/// Normalised command produced from one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutedEvent {
    NewMessage {
        thread_id: ThreadId,
        message: Message,
        is_mine: bool,
    },
    Typing {
        thread_id: ThreadId,
        user_id: UserId,
        is_typing: bool,
    },
    ReadReceipt {
        thread_id: ThreadId,
        reader: UserId,
        message_ids: Vec<MessageId>,
    },
    Notification(Notification),
}

#[derive(Debug, Clone)]
pub struct EventRouter {
    local_user: UserId,
}

impl EventRouter {
    pub fn new(local_user: impl Into<UserId>) -> Self {
        Self {
            local_user: local_user.into(),
        }
    }

    pub fn local_user(&self) -> &str {
        &self.local_user
    }

    /// Malformed or unknown frames are logged and dropped; the channel
    /// itself is never affected.
    pub fn route(&self, channel: &ChannelKey, text: &str) -> Option<RoutedEvent> {
        match self.parse_frame(channel, text) {
            Ok(event) => event,
            Err(e) => {
                warn!("[ROUTER] Failed to parse frame on {}: {} - Raw: {}", channel, e, text);
                None
            }
        }
    }

    fn parse_frame(&self, channel: &ChannelKey, text: &str) -> Result<Option<RoutedEvent>, String> {
        // envelope first, the payload shape depends on `type`
        let generic: Value = serde_json::from_str(text).map_err(|e| format!("Invalid JSON: {}", e))?;

        let event_type = generic
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or("Missing type field")?;
        let data = generic.get("data").cloned().ok_or("Missing data field")?;

        match event_type {
            frames::NEW_MESSAGE => {
                let mut message: Message = serde_json::from_value(data)
                    .map_err(|e| format!("Failed to parse new_message: {}", e))?;
                let Some(thread_id) = resolve_thread(&message.thread_id, &generic, channel) else {
                    debug!("[ROUTER] new_message {} without thread reference on {}", message.id, channel);
                    return Ok(None);
                };
                message.thread_id = thread_id.clone();
                let is_mine = message.is_from(&self.local_user);
                Ok(Some(RoutedEvent::NewMessage { thread_id, message, is_mine }))
            }
            frames::TYPING => {
                let payload: TypingPayload = serde_json::from_value(data)
                    .map_err(|e| format!("Failed to parse typing: {}", e))?;
                if payload.user_id == self.local_user {
                    return Ok(None);
                }
                let Some(thread_id) = resolve_thread(&payload.thread_id, &generic, channel) else {
                    return Ok(None);
                };
                Ok(Some(RoutedEvent::Typing {
                    thread_id,
                    user_id: payload.user_id,
                    is_typing: payload.is_typing,
                }))
            }
            frames::READ => {
                let payload: ReadPayload = serde_json::from_value(data)
                    .map_err(|e| format!("Failed to parse read: {}", e))?;
                let Some(thread_id) = resolve_thread(&payload.thread_id, &generic, channel) else {
                    return Ok(None);
                };
                Ok(Some(RoutedEvent::ReadReceipt {
                    thread_id,
                    reader: payload.reader,
                    message_ids: payload.message_ids,
                }))
            }
            frames::NOTIFICATION => {
                let notification: Notification = serde_json::from_value(data)
                    .map_err(|e| format!("Failed to parse notification: {}", e))?;
                Ok(Some(RoutedEvent::Notification(notification)))
            }
            other => {
                debug!("[ROUTER] Ignoring unknown frame type {} on {}", other, channel);
                Ok(None)
            }
        }
    }
}

/// Payload reference first, then a top-level `thread_id`, then the
/// channel's own thread.
fn resolve_thread(payload_thread: &str, frame: &Value, channel: &ChannelKey) -> Option<ThreadId> {
    if !payload_thread.is_empty() {
        return Some(payload_thread.to_string());
    }
    if let Some(id) = frame.get("thread_id").and_then(wire::id_from_value) {
        return Some(id);
    }
    channel.thread_id().map(str::to_string)
}
