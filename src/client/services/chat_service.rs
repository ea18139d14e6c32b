use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::client::config::ClientConfig;
use crate::client::error::{ChatError, ChatResult};
use crate::client::models::frames::OutboundFrame;
use crate::client::models::messages::{Attachment, Message, MessageDraft, ThreadId, UserId};
use crate::client::models::threads::{ContextRef, Thread, ThreadSummary};
use crate::client::services::api::MessagingApi;
use crate::client::services::connection_registry::{ChannelKey, ConnectionRegistry, RegistryEvent};
use crate::client::services::event_router::{EventRouter, RoutedEvent};
use crate::client::services::list_sync::ThreadListSync;
use crate::client::services::message_store::MessageStore;
use crate::client::services::notifications::NotificationCenter;
use crate::client::services::unread_tracker::UnreadTracker;
use crate::client::utils::processed_ids::ProcessedIdWindow;

/// Composition root of the messaging core: owns the stores and drives the
/// registry. Mutations happen on one task; inbound frames arrive through
/// [`ChatService::handle_event`].
pub struct ChatService {
    config: ClientConfig,
    api: Arc<dyn MessagingApi>,
    registry: ConnectionRegistry,
    router: EventRouter,
    store: MessageStore,
    unread: UnreadTracker,
    threads: ThreadListSync,
    notifications: NotificationCenter,
    /// Detail records of threads opened or created in this session.
    details: HashMap<ThreadId, Thread>,
    typing: HashMap<ThreadId, HashSet<UserId>>,
}

impl ChatService {
    pub fn new(config: ClientConfig, api: Arc<dyn MessagingApi>, registry: ConnectionRegistry) -> Self {
        let window = || ProcessedIdWindow::new(config.processed_id_capacity, config.processed_id_trim_to);
        Self {
            router: EventRouter::new(config.user_id.clone()),
            store: MessageStore::with_window(config.user_id.clone(), window()),
            unread: UnreadTracker::with_window(window()),
            threads: ThreadListSync::new(),
            notifications: NotificationCenter::new(),
            details: HashMap::new(),
            typing: HashMap::new(),
            api,
            registry,
            config,
        }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn unread(&self) -> &UnreadTracker {
        &self.unread
    }

    pub fn threads(&self) -> &ThreadListSync {
        &self.threads
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn active_thread(&self) -> Option<&str> {
        self.store.active()
    }

    pub fn typing_users(&self, thread_id: &str) -> Vec<&str> {
        let mut users: Vec<&str> = self
            .typing
            .get(thread_id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        users.sort_unstable();
        users
    }

    pub async fn connect_notifications(&self) -> ChatResult<bool> {
        let channel = ChannelKey::Notifications;
        let url = self.config.channel_url(&channel)?;
        Ok(self.registry.connect(channel, url).await)
    }

    /// Switches the active thread: previous chat channel is torn down, the
    /// new one connected, page 1 loaded and the thread marked read.
    pub async fn open_thread(&mut self, thread_id: &str) -> ChatResult<()> {
        if self.store.is_active(thread_id) {
            return Ok(());
        }
        self.close_thread().await;

        let thread = self.api.get_thread(thread_id).await?;
        thread.validate()?;
        self.details.insert(thread.id.clone(), thread);
        self.store.set_active(Some(thread_id.to_string()));

        let channel = ChannelKey::Thread(thread_id.to_string());
        let url = self.config.channel_url(&channel)?;
        self.registry.connect(channel, url).await;

        self.load_page(thread_id, 1).await?;
        self.mark_thread_read(thread_id).await?;
        info!("[CHAT_SERVICE] opened thread {}", thread_id);
        Ok(())
    }

    pub async fn close_thread(&mut self) {
        let Some(previous) = self.store.active().map(str::to_string) else {
            return;
        };
        self.registry.disconnect(&ChannelKey::Thread(previous.clone())).await;
        self.typing.remove(&previous);
        self.store.set_active(None);
        debug!("[CHAT_SERVICE] closed thread {}", previous);
    }

    /// Returns whether the server has more pages.
    pub async fn load_page(&mut self, thread_id: &str, page: u32) -> ChatResult<bool> {
        let response = self.api.list_messages(thread_id, page).await?;
        let has_more = response.has_more();
        self.store.fetch_page(thread_id, page, response.results);
        Ok(has_more)
    }

    pub async fn load_older(&mut self, page: u32) -> ChatResult<bool> {
        let thread_id = self.store.active().ok_or(ChatError::NoActiveThread)?.to_string();
        self.load_page(&thread_id, page).await
    }

    /// Optimistic send on the active thread. On failure the placeholder is
    /// dropped and the error handed back once; there is no automatic retry.
    pub async fn send_message(&mut self, content: &str, attachments: Vec<Attachment>) -> ChatResult<Message> {
        let thread_id = self.store.active().ok_or(ChatError::NoActiveThread)?.to_string();
        if content.trim().is_empty() && attachments.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if let Some(thread) = self.details.get(&thread_id) {
            if !thread.accepts_sends() {
                return Err(ChatError::ThreadLocked(thread_id));
            }
        }

        let draft = MessageDraft {
            content: content.to_string(),
            attachments: attachments.clone(),
            created_at: None,
        };
        let placeholder = self.store.add_optimistic_message(&thread_id, draft);
        self.threads.set_last_message(&placeholder);

        match self.api.send_message(&thread_id, content, &attachments).await {
            Ok(server_message) => {
                if self.store.confirm_send(&thread_id, &placeholder.id, server_message.clone()) {
                    self.threads.apply_live_message(&server_message, false);
                }
                self.threads.replace_last_message(&thread_id, &placeholder.id, &server_message);
                self.unread.mark_already_counted(&server_message.id);
                Ok(server_message)
            }
            Err(e) => {
                warn!("[CHAT_SERVICE] send to {} failed: {}", thread_id, e);
                self.store.reject_send(&thread_id, &placeholder.id);
                let fallback = self.store.messages(&thread_id).last();
                self.threads.restore_last_message(&thread_id, &placeholder.id, fallback);
                Err(e.into())
            }
        }
    }

    pub async fn send_typing(&self, is_typing: bool) -> ChatResult<()> {
        let thread_id = self.store.active().ok_or(ChatError::NoActiveThread)?;
        let channel = ChannelKey::Thread(thread_id.to_string());
        self.registry.send(&channel, &OutboundFrame::Typing { is_typing }).await?;
        Ok(())
    }

    /// Decrements by what the server says it marked, never by a local guess.
    pub async fn mark_thread_read(&mut self, thread_id: &str) -> ChatResult<u64> {
        let marked = self.api.mark_thread_read(thread_id).await?;
        let global = self.unread.apply_thread_read(thread_id, marked);
        self.threads.clear_unread(thread_id);
        Ok(global)
    }

    /// No request is made for an item already READ.
    pub async fn mark_notification_read(&mut self, notification_id: &str) -> ChatResult<bool> {
        match self.notifications.get(notification_id) {
            None => return Err(ChatError::UnknownNotification(notification_id.to_string())),
            Some(n) if !n.is_unread() => return Ok(false),
            Some(_) => {}
        }
        self.api.mark_notification_read(notification_id).await?;
        Ok(self.notifications.mark_read(notification_id))
    }

    /// Always reaches the server: unread items may sit on pages never
    /// loaded here. Returns how many local items changed.
    pub async fn mark_all_notifications_read(&mut self) -> ChatResult<usize> {
        let marked = self.api.mark_all_notifications_read().await?;
        let changed = self.notifications.mark_all_read();
        debug!("[CHAT_SERVICE] server marked {} notification(s), {} local", marked, changed);
        Ok(changed)
    }

    pub async fn refresh_threads(&mut self) -> ChatResult<()> {
        let page = self.api.list_threads(1).await?;
        // The store window is left alone: a pushed copy still has to reach
        // the thread log, only the counters must not move twice.
        for last in page.results.iter().filter_map(|t| t.last_message.as_ref()) {
            self.unread.mark_already_counted(&last.id);
        }
        self.threads.apply_fetch(page.results);
        self.unread.reconcile(
            self.threads
                .threads()
                .iter()
                .map(|t| (t.id.as_str(), t.unread_count)),
        );
        Ok(())
    }

    pub async fn refresh_notifications(&mut self) -> ChatResult<()> {
        let page = self.api.list_notifications(1).await?;
        self.notifications.replace_from_fetch(page.results);
        Ok(())
    }

    pub async fn create_contextual_thread(&mut self, context: &ContextRef) -> ChatResult<Thread> {
        let thread = self.api.create_contextual_thread(context).await?;
        thread.validate()?;
        self.threads.upsert(ThreadSummary::from(&thread));
        self.details.insert(thread.id.clone(), thread.clone());
        Ok(thread)
    }

    pub async fn handle_event(&mut self, event: RegistryEvent) {
        match event {
            RegistryEvent::StateChanged { channel, state } => {
                debug!("[CHAT_SERVICE] {} is now {:?}", channel, state);
            }
            RegistryEvent::Frame { channel, text } => {
                if let Some(routed) = self.router.route(&channel, &text) {
                    self.apply(routed).await;
                }
            }
        }
    }

    async fn apply(&mut self, event: RoutedEvent) {
        match event {
            RoutedEvent::NewMessage { thread_id, message, is_mine } => {
                let sender = message.sender.clone();
                let message_id = message.id.clone();
                if !self.store.apply_inbound(&thread_id, message.clone(), is_mine) {
                    return;
                }
                let counted = self
                    .unread
                    .record_inbound(&thread_id, &message_id, is_mine, self.store.active());
                self.threads.apply_live_message(&message, counted);
                if let Some(users) = self.typing.get_mut(&thread_id) {
                    users.remove(&sender);
                }
                if !is_mine && self.store.is_active(&thread_id) {
                    let receipt = OutboundFrame::ReadReceipt { message_ids: vec![message_id] };
                    let channel = ChannelKey::Thread(thread_id);
                    if let Err(e) = self.registry.send(&channel, &receipt).await {
                        debug!("[CHAT_SERVICE] read receipt not sent: {}", e);
                    }
                }
            }
            RoutedEvent::Typing { thread_id, user_id, is_typing } => {
                let users = self.typing.entry(thread_id).or_default();
                if is_typing {
                    users.insert(user_id);
                } else {
                    users.remove(&user_id);
                }
            }
            RoutedEvent::ReadReceipt { thread_id, reader, message_ids } => {
                if reader == self.router.local_user() {
                    return;
                }
                let changed = self.store.mark_read_by(&thread_id, &reader, &message_ids);
                debug!("[CHAT_SERVICE] {} read {} message(s) in {}", reader, changed, thread_id);
            }
            RoutedEvent::Notification(notification) => {
                self.notifications.apply_pushed(notification);
            }
        }
    }

    pub async fn shutdown(&mut self) {
        self.registry.teardown().await;
        self.typing.clear();
        self.store.set_active(None);
        info!("[CHAT_SERVICE] shut down");
    }
}
