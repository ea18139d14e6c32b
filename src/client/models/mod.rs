pub mod frames;
pub mod messages;
pub mod notifications;
pub mod threads;
pub mod wire;
