pub mod client;
pub mod utils;

pub use client::config::ClientConfig;
pub use client::error::{ApiError, ChatError, ChatResult, ConnectionError};
pub use client::services::chat_service::ChatService;
pub use client::services::connection_registry::{ChannelKey, ChannelState, ConnectionRegistry, RegistryEvent};
