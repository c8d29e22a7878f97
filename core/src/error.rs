/// Error types for conversation sessions
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// Participant id has no backing record; fatal to `open`
    #[error("Participant not found: {0}")]
    NotFound(String),

    #[error("Message text is empty")]
    EmptyInput,

    #[error("Permission denied by attachment picker")]
    PermissionDenied,

    #[error("Attachment error: {0}")]
    Attachment(String),

    #[error("Conversation session is closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    /// Everything except a failed `open` leaves the session usable
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ChatError::NotFound(_) | ChatError::Config(_) | ChatError::SessionClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
