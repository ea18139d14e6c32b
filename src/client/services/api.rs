use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::client::error::ApiError;
use crate::client::models::messages::{Attachment, Message};
use crate::client::models::notifications::Notification;
use crate::client::models::threads::{ContextRef, Thread, ThreadSummary};

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: Option<u64>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageBody<T> {
    Envelope {
        results: Vec<T>,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
    },
    Bare(Vec<T>),
}

impl<T> Page<T> {
    pub fn single(results: Vec<T>) -> Self {
        Self {
            results,
            count: None,
            next: None,
            previous: None,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// List endpoints answer either a bare array or a
    /// `{results, count, next, previous}` envelope.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let body: PageBody<T> =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(match body {
            PageBody::Envelope { results, count, next, previous } => Self { results, count, next, previous },
            PageBody::Bare(results) => {
                let count = Some(results.len() as u64);
                Self { results, count, next: None, previous: None }
            }
        })
    }

    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Self::from_value(value)
    }
}

/// Number of messages the server reports as newly read in a
/// `POST /threads/{id}/read` response.
pub fn read_count(body: &Value) -> u64 {
    ["marked_count", "marked_read", "count", "updated"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_u64))
        .unwrap_or(0)
}

/// REST collaborator. Implementations own transport, retries and token
/// refresh; the messaging core only consumes the results.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// `GET /threads?page=`
    async fn list_threads(&self, page: u32) -> Result<Page<ThreadSummary>, ApiError>;
    /// `GET /threads/{id}`
    async fn get_thread(&self, thread_id: &str) -> Result<Thread, ApiError>;
    /// `GET /threads/{id}/messages?page=`
    async fn list_messages(&self, thread_id: &str, page: u32) -> Result<Page<Message>, ApiError>;
    /// `POST /threads/{id}/messages`
    async fn send_message(&self, thread_id: &str, content: &str, attachments: &[Attachment]) -> Result<Message, ApiError>;
    /// `POST /threads/{id}/read`, returns how many messages were marked.
    async fn mark_thread_read(&self, thread_id: &str) -> Result<u64, ApiError>;
    /// `POST /threads/create_contextual`
    async fn create_contextual_thread(&self, context: &ContextRef) -> Result<Thread, ApiError>;
    /// `GET /notifications?page=`
    async fn list_notifications(&self, page: u32) -> Result<Page<Notification>, ApiError>;
    /// `POST /notifications/{id}/read`
    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ApiError>;
    /// `POST /notifications/read_all`
    async fn mark_all_notifications_read(&self) -> Result<u64, ApiError>;
}
