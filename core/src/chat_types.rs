/// Shared types for the conversation layer
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-conversation message id, allocated in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// The remote counterpart of a conversation, as returned by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub is_online: bool,
    /// e.g. "Active 5m ago"
    pub last_seen_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeKind {
    Image,
    File,
}

/// Metadata of a picked image or document. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    pub display_name: String,
    pub size_bytes: u64,
    /// Binary-unit label such as "2.4 MB"
    pub size_label: String,
    pub mime_kind: MimeKind,
    /// Uppercase extension tag ("PDF", "DOCX", "FILE"); documents only
    pub file_type: Option<String>,
    pub source_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    File,
}

/// Payload of a message: text, or exactly one attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    Attachment { attachment: AttachmentDescriptor },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text { text: text.into() }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MessageContent::Text { .. } => MessageKind::Text,
            MessageContent::Attachment { attachment } => match attachment.mime_kind {
                MimeKind::Image => MessageKind::Image,
                MimeKind::File => MessageKind::File,
            },
        }
    }

    /// One-line preview for conversation lists and terminal output
    pub fn preview(&self) -> String {
        match self {
            MessageContent::Text { text } => text.clone(),
            MessageContent::Attachment { attachment } => match attachment.mime_kind {
                MimeKind::Image => format!("[Image] {}", attachment.display_name),
                MimeKind::File => format!(
                    "[{}] {} ({})",
                    attachment.file_type.as_deref().unwrap_or("FILE"),
                    attachment.display_name,
                    attachment.size_label
                ),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
    pub originated_locally: bool,
    /// Monotonic: never goes back to false once set
    pub is_read: bool,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        self.content.kind()
    }

    pub fn is_remote_unread(&self) -> bool {
        !self.originated_locally && !self.is_read
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(text),
            MessageContent::Attachment { .. } => None,
        }
    }
}

/// Immutable view of one conversation, delivered on every state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub session_id: String,
    pub participant: User,
    pub messages: Vec<Message>,
    pub is_typing_remote: bool,
    pub is_loading: bool,
    /// Pending input buffer
    pub draft: String,
    /// Set once the session has been closed; the snapshot is then frozen
    pub closed: bool,
}

impl ConversationSnapshot {
    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_remote_unread()).count()
    }
}

/// Summary of one open conversation (for list views)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub participant_id: String,
    pub display_name: String,
    pub last_preview: String,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub unread_count: usize,
    pub is_typing_remote: bool,
}

/// Real-time events broadcast by the chat service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    SessionOpened {
        session_id: String,
        participant_id: String,
    },
    LoadingChanged {
        participant_id: String,
        is_loading: bool,
    },
    /// `at_head` is true for refresh injections
    MessageAdded {
        participant_id: String,
        message: Message,
        at_head: bool,
    },
    MessagesRead {
        participant_id: String,
        message_ids: Vec<MessageId>,
    },
    TypingChanged {
        participant_id: String,
        is_typing: bool,
    },
    SessionClosed {
        participant_id: String,
    },
}
