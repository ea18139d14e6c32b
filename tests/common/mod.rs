#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;
use url::Url;

use marketplace_messaging::client::error::{ApiError, ConnectionError};
use marketplace_messaging::client::models::messages::{Attachment, Message, MessageStatus};
use marketplace_messaging::client::models::notifications::{
    Notification, NotificationCategory, NotificationStatus,
};
use marketplace_messaging::client::models::threads::{
    ContextRef, Thread, ThreadStatus, ThreadSummary, ThreadType,
};
use marketplace_messaging::client::services::api::{MessagingApi, Page};
use marketplace_messaging::client::services::connection_registry::{Connector, Transport};

/// What the next dial does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Refuse,
    CloseImmediately,
    Hold,
    /// Opens, then the first read fails with a socket error.
    ErrorAfterOpen,
    /// Stays open but every write fails.
    RejectWrites,
}

#[derive(Default)]
struct ConnectorState {
    attempts: u32,
    script: VecDeque<Script>,
    urls: Vec<String>,
    peers: Vec<mpsc::UnboundedSender<String>>,
}

/// In-memory connector. Unscripted dials hold the connection open.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<ConnectorState>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(steps: &[Script]) -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().script.extend(steps.iter().copied());
        connector
    }

    pub fn attempts(&self) -> u32 {
        self.state.lock().unwrap().attempts
    }

    pub fn urls(&self) -> Vec<String> {
        self.state.lock().unwrap().urls.clone()
    }

    /// Every text frame written by any transport so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivers `text` on the most recent connection.
    pub fn push(&self, text: &str) -> bool {
        let state = self.state.lock().unwrap();
        match state.peers.last() {
            Some(peer) => peer.send(text.to_string()).is_ok(),
            None => false,
        }
    }

    /// Server-side close of the most recent connection.
    pub fn close_latest(&self) {
        self.state.lock().unwrap().peers.pop();
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, ConnectionError> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        state.urls.push(url.to_string());
        let step = state.script.pop_front().unwrap_or(Script::Hold);
        if step == Script::Refuse {
            return Err(ConnectionError::ConnectFailed("refused".into()));
        }
        let (peer, inbound) = mpsc::unbounded_channel();
        if matches!(step, Script::Hold | Script::RejectWrites) {
            state.peers.push(peer);
        }
        Ok(Box::new(FakeTransport {
            inbound,
            sent: self.sent.clone(),
            read_error: step == Script::ErrorAfterOpen,
            reject_writes: step == Script::RejectWrites,
        }))
    }
}

pub struct FakeTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    sent: Arc<Mutex<Vec<String>>>,
    read_error: bool,
    reject_writes: bool,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        if self.reject_writes {
            return Err(ConnectionError::SendFailed("broken pipe".into()));
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, ConnectionError>> {
        if std::mem::take(&mut self.read_error) {
            return Some(Err(ConnectionError::Closed("connection reset".into())));
        }
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

#[derive(Default)]
pub struct ApiState {
    pub threads: HashMap<String, Thread>,
    pub thread_list: Vec<ThreadSummary>,
    pub messages: HashMap<(String, u32), Page<Message>>,
    pub send_results: VecDeque<Result<Message, ApiError>>,
    pub read_counts: HashMap<String, u64>,
    pub created: Option<Thread>,
    pub notifications: Vec<Notification>,
    pub read_all_count: u64,
    pub calls: Vec<String>,
}

/// Scripted REST collaborator that records every call.
#[derive(Default)]
pub struct FakeApi {
    pub state: Mutex<ApiState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, ApiState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl MessagingApi for FakeApi {
    async fn list_threads(&self, page: u32) -> Result<Page<ThreadSummary>, ApiError> {
        let state = self.record(format!("list_threads:{}", page));
        Ok(Page::single(state.thread_list.clone()))
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Thread, ApiError> {
        let state = self.record(format!("get_thread:{}", thread_id));
        state.threads.get(thread_id).cloned().ok_or(ApiError::Status {
            status: 404,
            message: "Not found".into(),
        })
    }

    async fn list_messages(&self, thread_id: &str, page: u32) -> Result<Page<Message>, ApiError> {
        let state = self.record(format!("list_messages:{}:{}", thread_id, page));
        Ok(state
            .messages
            .get(&(thread_id.to_string(), page))
            .cloned()
            .unwrap_or_else(|| Page::single(Vec::new())))
    }

    async fn send_message(
        &self,
        thread_id: &str,
        content: &str,
        _attachments: &[Attachment],
    ) -> Result<Message, ApiError> {
        let mut state = self.record(format!("send_message:{}:{}", thread_id, content));
        state
            .send_results
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response".into())))
    }

    async fn mark_thread_read(&self, thread_id: &str) -> Result<u64, ApiError> {
        let mut state = self.record(format!("mark_thread_read:{}", thread_id));
        Ok(state.read_counts.remove(thread_id).unwrap_or(0))
    }

    async fn create_contextual_thread(&self, context: &ContextRef) -> Result<Thread, ApiError> {
        let state = self.record(format!("create_contextual_thread:{}", context.context_id));
        state.created.clone().ok_or(ApiError::Status {
            status: 400,
            message: "Bad request".into(),
        })
    }

    async fn list_notifications(&self, page: u32) -> Result<Page<Notification>, ApiError> {
        let state = self.record(format!("list_notifications:{}", page));
        Ok(Page::single(state.notifications.clone()))
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ApiError> {
        self.record(format!("mark_notification_read:{}", notification_id));
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<u64, ApiError> {
        let state = self.record("mark_all_notifications_read".to_string());
        Ok(state.read_all_count)
    }
}

pub fn thread(id: &str, status: ThreadStatus) -> Thread {
    Thread {
        id: id.to_string(),
        thread_type: ThreadType::Booking,
        status,
        participants: vec!["me".into(), "bob".into()],
        subject: Some(format!("Booking {}", id)),
        message_count: 0,
        unread_count: 0,
        updated_at: Utc.timestamp_opt(1_000, 0).unwrap(),
    }
}

pub fn summary(id: &str, unread: u64) -> ThreadSummary {
    ThreadSummary {
        unread_count: unread,
        ..ThreadSummary::from(&thread(id, ThreadStatus::Open))
    }
}

pub fn message(thread_id: &str, id: &str, sender: &str, secs: i64) -> Message {
    Message {
        id: id.to_string(),
        thread_id: thread_id.to_string(),
        sender: sender.to_string(),
        content: format!("content of {}", id),
        attachments: vec![],
        status: MessageStatus::Sent,
        created_at: Utc.timestamp_opt(secs, 0).unwrap(),
    }
}

pub fn notification(id: &str, secs: i64, status: NotificationStatus) -> Notification {
    Notification {
        id: id.to_string(),
        category: NotificationCategory::Booking,
        title: format!("Notification {}", id),
        body: String::new(),
        status,
        created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        data: serde_json::Value::Null,
    }
}

/// `new_message` frame as the chat channel delivers it.
pub fn new_message_frame(id: &str, sender: &str, secs: i64) -> String {
    serde_json::json!({
        "type": "new_message",
        "data": {"id": id, "sender": sender, "content": "pushed", "created_at": secs}
    })
    .to_string()
}
