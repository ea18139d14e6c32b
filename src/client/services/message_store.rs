use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::client::models::messages::{
    sort_chronologically, Message, MessageDraft, MessageId, MessageStatus, ThreadId, UserId,
};
use crate::client::utils::processed_ids::ProcessedIdWindow;

/// Lifecycle of one optimistic send, keyed by placeholder id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendState {
    Pending,
    Confirmed { server_id: MessageId },
    Failed,
}

/// Per-thread message collections. Every mutation goes through the
/// operations below so that id dedup and chronological order hold after
/// each call.
///
/// Each thread has a single log; the "current view" is the log of the
/// active thread, so removing a placeholder from the log removes it from
/// every place it is shown.
#[derive(Debug, Default)]
pub struct MessageStore {
    local_user: UserId,
    threads: HashMap<ThreadId, Vec<Message>>,
    active: Option<ThreadId>,
    sends: HashMap<MessageId, SendState>,
    processed: ProcessedIdWindow,
}

impl MessageStore {
    pub fn new(local_user: impl Into<UserId>) -> Self {
        Self::with_window(local_user, ProcessedIdWindow::default())
    }

    pub fn with_window(local_user: impl Into<UserId>, processed: ProcessedIdWindow) -> Self {
        Self {
            local_user: local_user.into(),
            threads: HashMap::new(),
            active: None,
            sends: HashMap::new(),
            processed,
        }
    }

    pub fn set_active(&mut self, thread_id: Option<ThreadId>) {
        self.active = thread_id;
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_active(&self, thread_id: &str) -> bool {
        self.active.as_deref() == Some(thread_id)
    }

    pub fn messages(&self, thread_id: &str) -> &[Message] {
        self.threads.get(thread_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Messages of the active thread.
    pub fn view(&self) -> &[Message] {
        match &self.active {
            Some(thread_id) => self.messages(thread_id),
            None => &[],
        }
    }

    pub fn send_state(&self, placeholder_id: &str) -> Option<&SendState> {
        self.sends.get(placeholder_id)
    }

    pub fn pending_sends(&self) -> usize {
        self.sends.len()
    }

    /// Page 1 is server-authoritative except for placeholders still in
    /// flight; later pages only prepend ids we don't have yet.
    pub fn fetch_page(&mut self, thread_id: &str, page: u32, server_messages: Vec<Message>) {
        let incoming: Vec<Message> = server_messages
            .into_iter()
            .map(|mut m| {
                if m.thread_id.is_empty() {
                    m.thread_id = thread_id.to_string();
                }
                m
            })
            .collect();
        for m in &incoming {
            self.processed.mark_seen(&m.id);
        }

        let log = self.threads.entry(thread_id.to_string()).or_default();
        if page <= 1 {
            let placeholders: Vec<Message> = log.drain(..).filter(Message::is_placeholder).collect();
            let mut seen = HashSet::new();
            let mut merged: Vec<Message> = incoming
                .into_iter()
                .filter(|m| seen.insert(m.id.clone()))
                .collect();
            debug!(
                "[STORE] thread {} page 1: {} from server, {} pending kept",
                thread_id,
                merged.len(),
                placeholders.len()
            );
            merged.extend(placeholders);
            *log = merged;
        } else {
            let mut known: HashSet<MessageId> = log.iter().map(|m| m.id.clone()).collect();
            let older: Vec<Message> = incoming
                .into_iter()
                .filter(|m| known.insert(m.id.clone()))
                .collect();
            debug!("[STORE] thread {} page {}: prepending {}", thread_id, page, older.len());
            log.splice(0..0, older);
        }
        sort_chronologically(log);
    }

    pub fn add_optimistic_message(&mut self, thread_id: &str, draft: MessageDraft) -> Message {
        let placeholder = Message::placeholder(thread_id, &self.local_user, draft);
        self.sends.insert(placeholder.id.clone(), SendState::Pending);
        let log = self.threads.entry(thread_id.to_string()).or_default();
        log.push(placeholder.clone());
        sort_chronologically(log);
        debug!("[STORE] queued {} in thread {}", placeholder.id, thread_id);
        placeholder
    }

    /// Swaps the placeholder for the server copy. Returns `false` when the
    /// server message was already present (live push won the race).
    pub fn confirm_send(&mut self, thread_id: &str, placeholder_id: &str, mut server_message: Message) -> bool {
        self.resolve_send(
            placeholder_id,
            SendState::Confirmed {
                server_id: server_message.id.clone(),
            },
        );
        self.processed.mark_seen(&server_message.id);
        if server_message.thread_id.is_empty() {
            server_message.thread_id = thread_id.to_string();
        }

        let log = self.threads.entry(thread_id.to_string()).or_default();
        log.retain(|m| m.id != placeholder_id);
        let inserted = if log.iter().any(|m| m.id == server_message.id) {
            false
        } else {
            log.push(server_message);
            true
        };
        sort_chronologically(log);
        inserted
    }

    /// Drops a failed send; no "sending" ghost is left behind.
    pub fn reject_send(&mut self, thread_id: &str, placeholder_id: &str) -> bool {
        self.resolve_send(placeholder_id, SendState::Failed);
        let Some(log) = self.threads.get_mut(thread_id) else {
            return false;
        };
        let before = log.len();
        log.retain(|m| m.id != placeholder_id);
        before != log.len()
    }

    /// Live-pushed message. Returns `true` only on first application.
    pub fn apply_inbound(&mut self, thread_id: &str, mut message: Message, is_mine: bool) -> bool {
        if !self.processed.mark_seen(&message.id) {
            debug!("[STORE] {} already processed, skipping", message.id);
            return false;
        }
        let log = self.threads.entry(thread_id.to_string()).or_default();
        if log.iter().any(|m| m.id == message.id) {
            return false;
        }
        message.thread_id = thread_id.to_string();
        debug!(
            "[STORE] applying {} to thread {} (mine: {})",
            message.id, thread_id, is_mine
        );
        log.push(message);
        sort_chronologically(log);
        true
    }

    /// Read receipt from `reader`: messages they did not author become READ.
    pub fn mark_read_by(&mut self, thread_id: &str, reader: &str, message_ids: &[MessageId]) -> usize {
        let Some(log) = self.threads.get_mut(thread_id) else {
            return 0;
        };
        let ids: HashSet<&str> = message_ids.iter().map(String::as_str).collect();
        let mut changed = 0;
        for message in log.iter_mut() {
            if ids.contains(message.id.as_str())
                && message.sender != reader
                && message.status != MessageStatus::Read
            {
                message.status = MessageStatus::Read;
                changed += 1;
            }
        }
        changed
    }

    // Only PENDING entries are kept; a terminal transition removes the entry.
    fn resolve_send(&mut self, placeholder_id: &str, outcome: SendState) {
        match self.sends.remove(placeholder_id) {
            Some(_) => info!("[STORE] send {} -> {:?}", placeholder_id, outcome),
            None => debug!("[STORE] no pending send for {}, {:?} ignored", placeholder_id, outcome),
        }
    }
}
