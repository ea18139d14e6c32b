use std::collections::HashMap;

use log::debug;

use crate::client::models::messages::Message;
use crate::client::models::threads::ThreadSummary;

/// Thread list view state: REST snapshots own membership and order, live
/// pushes adjust counters in between.
#[derive(Debug, Default)]
pub struct ThreadListSync {
    threads: Vec<ThreadSummary>,
}

impl ThreadListSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(&self) -> &[ThreadSummary] {
        &self.threads
    }

    pub fn get(&self, thread_id: &str) -> Option<&ThreadSummary> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    /// Replaces the list. A local row whose live deltas are newer than the
    /// fetched row keeps its counters; on a tie the server wins.
    pub fn apply_fetch(&mut self, fetched: Vec<ThreadSummary>) {
        let mut local: HashMap<String, ThreadSummary> =
            self.threads.drain(..).map(|t| (t.id.clone(), t)).collect();
        let mut kept_live = 0;
        self.threads = fetched
            .into_iter()
            .map(|remote| match local.remove(&remote.id) {
                Some(live) if live.updated_at > remote.updated_at => {
                    kept_live += 1;
                    ThreadSummary {
                        message_count: live.message_count,
                        unread_count: live.unread_count,
                        updated_at: live.updated_at,
                        last_message: live.last_message,
                        ..remote
                    }
                }
                _ => remote,
            })
            .collect();
        debug!(
            "[SYNC] thread list replaced: {} rows, {} kept live counters",
            self.threads.len(),
            kept_live
        );
    }

    /// Adds a thread that is not listed yet (e.g. just created).
    pub fn upsert(&mut self, summary: ThreadSummary) {
        match self.threads.iter_mut().find(|t| t.id == summary.id) {
            Some(existing) => *existing = summary,
            None => self.threads.insert(0, summary),
        }
    }

    /// Live message delta. Unknown threads are left for the next fetch, and
    /// a message the row already shows as its last one is not counted again.
    pub fn apply_live_message(&mut self, message: &Message, count_unread: bool) -> bool {
        let Some(index) = self.threads.iter().position(|t| t.id == message.thread_id) else {
            return false;
        };
        if self.threads[index].last_message.as_ref().map(|m| m.id.as_str()) == Some(message.id.as_str()) {
            debug!("[SYNC] {} already reflected in thread {}", message.id, message.thread_id);
            return false;
        }
        let mut row = self.threads.remove(index);
        row.message_count += 1;
        if count_unread {
            row.unread_count += 1;
        }
        if message.created_at > row.updated_at {
            row.updated_at = message.created_at;
        }
        row.last_message = Some(message.clone());
        self.threads.insert(0, row);
        true
    }

    /// Preview only, counters untouched (optimistic sends).
    pub fn set_last_message(&mut self, message: &Message) {
        if let Some(row) = self.threads.iter_mut().find(|t| t.id == message.thread_id) {
            row.last_message = Some(message.clone());
        }
    }

    pub fn replace_last_message(&mut self, thread_id: &str, placeholder_id: &str, message: &Message) {
        if let Some(row) = self.threads.iter_mut().find(|t| t.id == thread_id) {
            if row.last_message.as_ref().map(|m| m.id.as_str()) == Some(placeholder_id) {
                row.last_message = Some(message.clone());
            }
        }
    }

    /// Undo the preview of a failed send.
    pub fn restore_last_message(&mut self, thread_id: &str, placeholder_id: &str, fallback: Option<&Message>) {
        if let Some(row) = self.threads.iter_mut().find(|t| t.id == thread_id) {
            if row.last_message.as_ref().map(|m| m.id.as_str()) == Some(placeholder_id) {
                row.last_message = fallback.cloned();
            }
        }
    }

    pub fn clear_unread(&mut self, thread_id: &str) {
        if let Some(row) = self.threads.iter_mut().find(|t| t.id == thread_id) {
            row.unread_count = 0;
        }
    }
}
