pub mod api;
pub mod chat_service;
pub mod connection_registry;
pub mod event_router;
pub mod list_sync;
pub mod message_store;
pub mod notifications;
pub mod unread_tracker;
