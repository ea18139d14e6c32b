use std::collections::HashMap;

use log::debug;

use crate::client::models::messages::ThreadId;
use crate::client::utils::processed_ids::ProcessedIdWindow;

/// Global and per-thread unread message counters.
#[derive(Debug, Default)]
pub struct UnreadTracker {
    global: u64,
    per_thread: HashMap<ThreadId, u64>,
    counted: ProcessedIdWindow,
}

impl UnreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(counted: ProcessedIdWindow) -> Self {
        Self {
            counted,
            ..Self::default()
        }
    }

    pub fn global(&self) -> u64 {
        self.global
    }

    pub fn thread(&self, thread_id: &str) -> u64 {
        self.per_thread.get(thread_id).copied().unwrap_or(0)
    }

    /// Counts a first-seen message from someone else in a thread that is
    /// not on screen. Returns whether the counters moved.
    pub fn record_inbound(
        &mut self,
        thread_id: &str,
        message_id: &str,
        is_mine: bool,
        active_thread: Option<&str>,
    ) -> bool {
        if !self.counted.mark_seen(message_id) {
            return false;
        }
        if is_mine || active_thread == Some(thread_id) {
            return false;
        }
        self.global += 1;
        *self.per_thread.entry(thread_id.to_string()).or_insert(0) += 1;
        debug!(
            "[UNREAD] {} counted in {} (thread {}, global {})",
            message_id,
            thread_id,
            self.thread(thread_id),
            self.global
        );
        true
    }

    /// Records an id the server already included in its counts, so a late
    /// push of the same message is not counted on top.
    pub fn mark_already_counted(&mut self, message_id: &str) {
        self.counted.mark_seen(message_id);
    }

    /// Applies the server-reported number of messages it just marked read.
    pub fn apply_thread_read(&mut self, thread_id: &str, server_count: u64) -> u64 {
        self.global = self.global.saturating_sub(server_count);
        self.per_thread.remove(thread_id);
        debug!(
            "[UNREAD] thread {} read, server marked {}, global now {}",
            thread_id, server_count, self.global
        );
        self.global
    }

    /// Takes per-thread counts from a fresh thread list.
    pub fn reconcile<'a, I>(&mut self, counts: I)
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        for (thread_id, unread) in counts {
            if unread == 0 {
                self.per_thread.remove(thread_id);
            } else {
                self.per_thread.insert(thread_id.to_string(), unread);
            }
        }
        self.global = self.per_thread.values().sum();
    }
}
