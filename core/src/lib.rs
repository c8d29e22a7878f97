/// Convo - conversation session engine for direct messaging
///
/// Owns the lifecycle of one chat at a time per participant: ordered message
/// store, simulated remote presence and replies, attachments, pull-to-refresh,
/// and date-grouped view formatting.

pub mod attachment;
pub mod chat_types;
pub mod cli_app;
pub mod config;
pub mod error;
pub mod message_store;
pub mod participant_directory;
pub mod session;
pub mod simulator;
pub mod utils;
pub mod view;

pub use chat_types::{ChatEvent, ConversationSnapshot, Message, MessageContent, MessageId, User};
pub use config::ChatConfig;
pub use error::{ChatError, Result};
pub use session::{AttachOutcome, ChatService, ConversationSession};
