use thiserror::Error;

use crate::client::models::messages::ThreadId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Invalid channel url: {0}")]
    InvalidUrl(String),
    #[error("Connection failed: {0}")]
    ConnectFailed(String),
    #[error("Channel {0} is not connected")]
    NotConnected(String),
    #[error("Frame send failed: {0}")]
    SendFailed(String),
    #[error("Connection closed: {0}")]
    Closed(String),
}

/// Failures reported by a REST collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Thread {0} is locked")]
    ThreadLocked(ThreadId),
    #[error("Cannot send an empty message")]
    EmptyMessage,
    #[error("No thread is open")]
    NoActiveThread,
    #[error("Unknown notification {0}")]
    UnknownNotification(String),
    #[error("Invalid thread: {0}")]
    InvalidThread(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
