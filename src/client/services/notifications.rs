use log::debug;

use crate::client::models::notifications::{Notification, NotificationStatus};
use crate::client::utils::processed_ids::ProcessedIdWindow;

/// Notification list plus its unread badge. Read-state transitions are
/// idempotent: only an UNREAD -> READ move touches the counter.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    items: Vec<Notification>,
    unread: u64,
    seen: ProcessedIdWindow,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn unread_count(&self) -> u64 {
        self.unread
    }

    /// The fetch is authoritative; live items newer than anything in it
    /// are kept on top.
    pub fn replace_from_fetch(&mut self, fetched: Vec<Notification>) {
        let newest_fetched = fetched.iter().map(|n| n.created_at).max();
        let mut items: Vec<Notification> = match newest_fetched {
            Some(newest) => self
                .items
                .drain(..)
                .filter(|live| live.created_at > newest && !fetched.iter().any(|f| f.id == live.id))
                .collect(),
            None => Vec::new(),
        };
        items.extend(fetched);
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for n in &items {
            self.seen.mark_seen(&n.id);
        }
        self.unread = items.iter().filter(|n| n.is_unread()).count() as u64;
        self.items = items;
        debug!("[NOTIFY] list replaced, {} unread", self.unread);
    }

    pub fn apply_pushed(&mut self, notification: Notification) -> bool {
        if !self.seen.mark_seen(&notification.id) || self.get(&notification.id).is_some() {
            return false;
        }
        if notification.is_unread() {
            self.unread += 1;
        }
        self.items.insert(0, notification);
        true
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if item.status == NotificationStatus::Read {
            return false;
        }
        item.status = NotificationStatus::Read;
        self.unread = self.unread.saturating_sub(1);
        true
    }

    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for item in self.items.iter_mut().filter(|n| n.is_unread()) {
            item.status = NotificationStatus::Read;
            changed += 1;
        }
        self.unread = self.unread.saturating_sub(changed as u64);
        changed
    }
}
