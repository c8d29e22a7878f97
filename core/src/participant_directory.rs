/// Participant lookup and seeded chat history
use crate::chat_types::{MessageContent, User};
use crate::error::{ChatError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// A message that exists before the session opens
#[derive(Debug, Clone)]
pub struct SeedMessage {
    pub content: MessageContent,
    pub sent_at: DateTime<Utc>,
    pub from_participant: bool,
    pub is_read: bool,
}

impl SeedMessage {
    pub fn remote(text: &str, sent_at: DateTime<Utc>, is_read: bool) -> Self {
        Self {
            content: MessageContent::text(text),
            sent_at,
            from_participant: true,
            is_read,
        }
    }

    pub fn local(text: &str, sent_at: DateTime<Utc>, is_read: bool) -> Self {
        Self {
            content: MessageContent::text(text),
            sent_at,
            from_participant: false,
            is_read,
        }
    }
}

/// Identity/participant lookup consumed by the chat service
pub trait ParticipantDirectory: Send + Sync {
    fn get_participant(&self, id: &str) -> Result<User>;

    /// History to seed the conversation with, oldest first (may be empty)
    fn seed_history(&self, id: &str) -> Vec<SeedMessage>;
}

struct Entry {
    user: User,
    history: Vec<SeedMessage>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    entries: HashMap<String, Entry>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_participant(&mut self, user: User, history: Vec<SeedMessage>) {
        self.entries.insert(user.id.clone(), Entry { user, history });
    }

    pub fn with_participant(mut self, user: User, history: Vec<SeedMessage>) -> Self {
        self.add_participant(user, history);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Job-board roster used by the demo binary; history is relative to `now`
    pub fn demo(now: DateTime<Utc>) -> Self {
        let yesterday = now - Duration::days(1);
        Self::new()
            .with_participant(
                user("sarah-johnson", "Sarah Johnson", true, "Online"),
                vec![
                    SeedMessage::remote(
                        "Hi! I came across your profile and think you'd be a great fit for our Senior Developer role.",
                        yesterday - Duration::minutes(45),
                        true,
                    ),
                    SeedMessage::local(
                        "Thanks Sarah! I'd love to hear more about the position.",
                        yesterday - Duration::minutes(30),
                        true,
                    ),
                    SeedMessage::remote(
                        "Great! The team works mostly with Rust and TypeScript. Are you open to hybrid work?",
                        now - Duration::minutes(20),
                        false,
                    ),
                    SeedMessage::remote(
                        "Also, could you send over your latest resume?",
                        now - Duration::minutes(19),
                        false,
                    ),
                ],
            )
            .with_participant(
                user("david-chen", "David Chen", false, "Active 2h ago"),
                vec![
                    SeedMessage::local(
                        "Hello David, following up on the backend engineer application.",
                        now - Duration::hours(3),
                        false,
                    ),
                    SeedMessage::remote(
                        "Hi! We're finishing the first round this week, you'll hear from us soon.",
                        now - Duration::hours(2),
                        true,
                    ),
                ],
            )
            .with_participant(user("maria-lopez", "Maria Lopez", false, "Active yesterday"), Vec::new())
    }
}

fn user(id: &str, name: &str, is_online: bool, last_seen: &str) -> User {
    User {
        id: id.to_string(),
        display_name: name.to_string(),
        avatar_ref: Some(format!("avatars/{}.png", id)),
        is_online,
        last_seen_label: last_seen.to_string(),
    }
}

impl ParticipantDirectory for InMemoryDirectory {
    fn get_participant(&self, id: &str) -> Result<User> {
        self.entries
            .get(id)
            .map(|e| e.user.clone())
            .ok_or_else(|| ChatError::NotFound(id.to_string()))
    }

    fn seed_history(&self, id: &str) -> Vec<SeedMessage> {
        self.entries
            .get(id)
            .map(|e| e.history.clone())
            .unwrap_or_default()
    }
}
