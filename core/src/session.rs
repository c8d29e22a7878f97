/// Conversation sessions: lifecycle, user operations and the open-session registry
///
/// All state of one conversation sits behind a single lock. User operations and
/// simulator timers both go through `SessionCore::mutate`, so every change is
/// applied atomically and published as one snapshot.
use crate::attachment::{self, AttachmentPicker, PickOutcome};
use crate::chat_types::{
    ChatEvent, ConversationSnapshot, ConversationSummary, Message, MessageContent, MessageId,
    MimeKind, User,
};
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::message_store::MessageStore;
use crate::participant_directory::{ParticipantDirectory, SeedMessage};
use crate::simulator::{presence, reply, ReplyPlan, TimerSet};
use crate::utils::{Clock, EventEmitter, SystemClock};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

type Registry = RwLock<HashMap<String, ConversationSession>>;

// ─── Conversation state ──────────────────────────────────────────────────────

pub(crate) struct Conversation {
    pub(crate) participant: User,
    pub(crate) store: MessageStore,
    pub(crate) presence_typing: bool,
    /// Replies currently inside their typing window
    pub(crate) reply_typing: usize,
    /// Open-time load plus in-flight refreshes
    loads_in_flight: usize,
    draft: String,
    pub(crate) rng: StdRng,
    outbox: Vec<ChatEvent>,
}

impl Conversation {
    fn new(participant: User, rng: StdRng) -> Self {
        Self {
            participant,
            store: MessageStore::new(),
            presence_typing: false,
            reply_typing: 0,
            loads_in_flight: 1,
            draft: String::new(),
            rng,
            outbox: Vec::new(),
        }
    }

    pub(crate) fn is_typing_remote(&self) -> bool {
        self.presence_typing || self.reply_typing > 0
    }

    fn is_loading(&self) -> bool {
        self.loads_in_flight > 0
    }

    /// Allocate an id, insert, and queue a `MessageAdded` event
    pub(crate) fn push_message(
        &mut self,
        content: MessageContent,
        originated_locally: bool,
        is_read: bool,
        created_at: DateTime<Utc>,
        at_head: bool,
    ) -> Message {
        let message = Message {
            id: self.store.next_id(),
            content,
            created_at,
            originated_locally,
            is_read,
        };
        if at_head {
            self.store.prepend(message.clone());
        } else {
            self.store.append(message.clone());
        }
        self.outbox.push(ChatEvent::MessageAdded {
            participant_id: self.participant.id.clone(),
            message: message.clone(),
            at_head,
        });
        message
    }

    /// Seeded history goes in silently, oldest first
    fn load_history(&mut self, mut history: Vec<SeedMessage>) {
        history.sort_by_key(|seed| seed.sent_at);
        for seed in history {
            let message = Message {
                id: self.store.next_id(),
                content: seed.content,
                created_at: seed.sent_at,
                originated_locally: !seed.from_participant,
                is_read: seed.is_read,
            };
            self.store.append(message);
        }
    }

    pub(crate) fn pick_text(&mut self, pool: &[String]) -> String {
        pool.choose(&mut self.rng).cloned().unwrap_or_default()
    }

    fn snapshot(&self, session_id: &str) -> ConversationSnapshot {
        ConversationSnapshot {
            session_id: session_id.to_string(),
            participant: self.participant.clone(),
            messages: self.store.snapshot(),
            is_typing_remote: self.is_typing_remote(),
            is_loading: self.is_loading(),
            draft: self.draft.clone(),
            closed: false,
        }
    }
}

// ─── Shared core ─────────────────────────────────────────────────────────────

pub(crate) struct SessionCore {
    pub(crate) session_id: String,
    pub(crate) participant_id: String,
    pub(crate) config: ChatConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) timers: TimerSet,
    /// `None` once closed; late timers find nothing to write to
    state: RwLock<Option<Conversation>>,
    emitter: EventEmitter,
    snapshots: watch::Sender<ConversationSnapshot>,
    /// Flips to true once the seeded history is in (or the session closed first)
    loaded: watch::Sender<bool>,
}

impl SessionCore {
    /// Run `f` against the live conversation and publish the result.
    /// Returns `None` if the session has been closed.
    pub(crate) async fn mutate<R>(&self, f: impl FnOnce(&mut Conversation) -> R) -> Option<R> {
        let mut guard = self.state.write().await;
        let conv = guard.as_mut()?;
        let typing_before = conv.is_typing_remote();
        let loading_before = conv.is_loading();

        let result = f(conv);

        if conv.is_typing_remote() != typing_before {
            conv.outbox.push(ChatEvent::TypingChanged {
                participant_id: self.participant_id.clone(),
                is_typing: conv.is_typing_remote(),
            });
        }
        if conv.is_loading() != loading_before {
            conv.outbox.push(ChatEvent::LoadingChanged {
                participant_id: self.participant_id.clone(),
                is_loading: conv.is_loading(),
            });
        }

        let snapshot = conv.snapshot(&self.session_id);
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        for event in conv.outbox.drain(..) {
            self.emitter.emit(event);
        }
        Some(result)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

// ─── Session handle ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    Sent(Message),
    /// The picker was dismissed; nothing was inserted
    Cancelled,
}

/// Handle to one open conversation. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ConversationSession {
    core: Arc<SessionCore>,
    registry: Weak<Registry>,
}

impl ConversationSession {
    fn create(
        participant: User,
        config: ChatConfig,
        clock: Arc<dyn Clock>,
        emitter: EventEmitter,
        registry: Weak<Registry>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let session_id = Uuid::new_v4().to_string();
        let participant_id = participant.id.clone();
        let conversation = Conversation::new(participant, rng);
        let (snapshots, _) = watch::channel(conversation.snapshot(&session_id));
        let (loaded, _) = watch::channel(false);

        emitter.emit(ChatEvent::SessionOpened {
            session_id: session_id.clone(),
            participant_id: participant_id.clone(),
        });
        emitter.emit(ChatEvent::LoadingChanged {
            participant_id: participant_id.clone(),
            is_loading: true,
        });

        Self {
            core: Arc::new(SessionCore {
                session_id,
                participant_id,
                config,
                clock,
                timers: TimerSet::new(),
                state: RwLock::new(Some(conversation)),
                emitter,
                snapshots,
                loaded,
            }),
            registry,
        }
    }

    async fn load(&self, history: Vec<SeedMessage>) {
        tokio::time::sleep(self.core.config.load_delay).await;
        let loaded = self
            .core
            .mutate(|conv| {
                conv.load_history(history);
                conv.loads_in_flight -= 1;
                conv.store.len()
            })
            .await;
        self.core.loaded.send_replace(true);

        match loaded {
            Some(count) => {
                info!(
                    "Loaded conversation with {} ({} messages)",
                    self.core.participant_id, count
                );
                if count > 0 {
                    presence::ensure_started(&self.core).await;
                }
            }
            None => debug!(
                "Session {} closed before its history loaded",
                self.core.session_id
            ),
        }
    }

    /// Resolves once the open-time load has finished
    pub async fn wait_loaded(&self) {
        let mut loaded = self.core.loaded.subscribe();
        // The sender lives as long as `core`, so this cannot fail
        let _ = loaded.wait_for(|done| *done).await;
    }

    pub fn session_id(&self) -> &str {
        &self.core.session_id
    }

    pub fn participant_id(&self) -> &str {
        &self.core.participant_id
    }

    /// Latest published state
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.core.snapshots.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.core.snapshots.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.core.snapshots.borrow().closed
    }

    /// Timers scheduled by the simulators that have not fired yet
    pub async fn pending_timers(&self) -> usize {
        self.core.timers.pending().await
    }

    pub async fn update_draft(&self, text: &str) -> Result<()> {
        self.core
            .mutate(|conv| conv.draft = text.to_string())
            .await
            .ok_or(ChatError::SessionClosed)
    }

    pub fn draft(&self) -> String {
        self.core.snapshots.borrow().draft.clone()
    }

    /// Optimistically append a local text message and schedule a remote reply.
    /// Waits for the seeded history first so it never lands behind this message.
    pub async fn send(&self, text: &str) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyInput);
        }
        self.wait_loaded().await;

        let config = &self.core.config;
        let (message, plan) = self
            .core
            .mutate(|conv| {
                let message =
                    conv.push_message(MessageContent::text(text), true, false, self.core.now(), false);
                conv.draft.clear();
                (message, ReplyPlan::draw(conv, config))
            })
            .await
            .ok_or(ChatError::SessionClosed)?;

        info!("Sent {} to {}", message.id, self.core.participant_id);
        reply::schedule_reply(&self.core, plan).await;
        presence::ensure_started(&self.core).await;
        Ok(message)
    }

    pub async fn send_draft(&self) -> Result<Message> {
        let draft = self.draft();
        self.send(&draft).await
    }

    /// Insert a resolved picker result as a local attachment message.
    /// Cancellation inserts nothing; picker failures leave the store untouched.
    pub async fn attach(&self, kind: MimeKind, outcome: PickOutcome) -> Result<AttachOutcome> {
        if self.is_closed() {
            return Err(ChatError::SessionClosed);
        }

        let descriptor = match attachment::resolve(kind, outcome) {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => return Ok(AttachOutcome::Cancelled),
            Err(e) => {
                warn!("Attachment for {} rejected: {}", self.core.participant_id, e);
                return Err(e);
            }
        };

        self.wait_loaded().await;
        let config = &self.core.config;
        let ack_text = match kind {
            MimeKind::Image => config.image_ack_text.clone(),
            MimeKind::File => config.file_ack_text.clone(),
        };
        let message = self
            .core
            .mutate(|conv| {
                conv.push_message(
                    MessageContent::Attachment { attachment: descriptor },
                    true,
                    false,
                    self.core.now(),
                    false,
                )
            })
            .await
            .ok_or(ChatError::SessionClosed)?;

        info!(
            "Attached {} to conversation with {}",
            message.content.preview(),
            self.core.participant_id
        );
        reply::schedule_ack(&self.core, config.attachment_ack_delay, ack_text).await;
        presence::ensure_started(&self.core).await;
        Ok(AttachOutcome::Sent(message))
    }

    /// Ask `picker` for an image or document, then `attach` the result
    pub async fn attach_from<P: AttachmentPicker>(
        &self,
        picker: &P,
        kind: MimeKind,
    ) -> Result<AttachOutcome> {
        let outcome = match kind {
            MimeKind::Image => picker.pick_image().await,
            MimeKind::File => picker.pick_document().await,
        };
        self.attach(kind, outcome).await
    }

    /// Flip every unread remote message to read. Returns the ids touched.
    pub async fn mark_all_remote_read(&self) -> Result<Vec<MessageId>> {
        let participant_id = self.core.participant_id.clone();
        self.core
            .mutate(|conv| {
                let ids = conv.store.mark_remote_read();
                if !ids.is_empty() {
                    conv.outbox.push(ChatEvent::MessagesRead {
                        participant_id,
                        message_ids: ids.clone(),
                    });
                }
                ids
            })
            .await
            .ok_or(ChatError::SessionClosed)
    }

    /// Pull-to-refresh: after a fixed delay, one new remote message lands at the head
    pub async fn refresh(&self) -> Result<Message> {
        self.core
            .mutate(|conv| conv.loads_in_flight += 1)
            .await
            .ok_or(ChatError::SessionClosed)?;

        tokio::time::sleep(self.core.config.refresh_delay).await;

        let pool = &self.core.config.refresh_pool;
        let message = self
            .core
            .mutate(|conv| {
                let text = conv.pick_text(pool);
                let message =
                    conv.push_message(MessageContent::text(text), false, false, self.core.now(), true);
                conv.loads_in_flight -= 1;
                message
            })
            .await;

        match message {
            Some(message) => {
                debug!("Refresh injected {} for {}", message.id, self.core.participant_id);
                presence::ensure_started(&self.core).await;
                Ok(message)
            }
            None => {
                debug!("Refresh finished after close; dropped");
                Err(ChatError::SessionClosed)
            }
        }
    }

    /// Start (or reset) a remote typing episode of the given length.
    /// Returns false without typing when the conversation has no messages.
    pub async fn start_typing_episode(&self, duration: Duration) -> Result<bool> {
        presence::start_episode(&self.core, duration)
            .await
            .ok_or(ChatError::SessionClosed)
    }

    /// Cancel every pending timer and discard the conversation.
    /// Returns false if the session was already closed.
    pub async fn close(&self) -> bool {
        let mut state = self.core.state.write().await;
        let Some(conversation) = state.take() else {
            return false;
        };
        let cancelled = self.core.timers.cancel_all().await;
        self.core.snapshots.send_modify(|s| {
            s.closed = true;
            s.is_typing_remote = false;
            s.is_loading = false;
        });
        drop(state);
        self.core.loaded.send_replace(true);

        self.core.emitter.emit(ChatEvent::SessionClosed {
            participant_id: self.core.participant_id.clone(),
        });
        info!(
            "Closed conversation with {} ({} messages discarded, {} pending timers cancelled)",
            self.core.participant_id,
            conversation.store.len(),
            cancelled
        );

        if let Some(registry) = self.registry.upgrade() {
            let mut sessions = registry.write().await;
            let same_session = sessions
                .get(&self.core.participant_id)
                .is_some_and(|s| s.session_id() == self.session_id());
            if same_session {
                sessions.remove(&self.core.participant_id);
            }
        }
        true
    }
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Owns the open sessions, at most one per participant
pub struct ChatService {
    directory: Arc<dyn ParticipantDirectory>,
    config: ChatConfig,
    clock: Arc<dyn Clock>,
    sessions: Arc<Registry>,
    emitter: EventEmitter,
}

impl ChatService {
    pub fn new(directory: Arc<dyn ParticipantDirectory>, config: ChatConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            directory,
            config,
            clock: Arc::new(SystemClock),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            emitter: EventEmitter::new(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Stream of events from every session of this service
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.emitter.subscribe()
    }

    /// Open (or return the already open) conversation with `participant_id`.
    /// Either way the returned session has its history loaded.
    pub async fn open(&self, participant_id: &str) -> Result<ConversationSession> {
        let (session, history) = {
            let mut sessions = self.sessions.write().await;
            let existing = sessions
                .get(participant_id)
                .filter(|s| !s.is_closed())
                .cloned();
            if let Some(existing) = existing {
                drop(sessions);
                debug!("Conversation with {} already open", participant_id);
                existing.wait_loaded().await;
                return Ok(existing);
            }

            let participant = self.directory.get_participant(participant_id).map_err(|e| {
                warn!("Cannot open conversation: {}", e);
                e
            })?;
            let session = ConversationSession::create(
                participant,
                self.config.clone(),
                self.clock.clone(),
                self.emitter.clone(),
                Arc::downgrade(&self.sessions),
            );
            sessions.insert(participant_id.to_string(), session.clone());
            (session, self.directory.seed_history(participant_id))
        };

        info!(
            "Opened conversation {} with {}",
            session.session_id(),
            participant_id
        );
        session.load(history).await;
        Ok(session)
    }

    pub async fn get(&self, participant_id: &str) -> Option<ConversationSession> {
        self.sessions.read().await.get(participant_id).cloned()
    }

    pub async fn close(&self, participant_id: &str) -> bool {
        match self.get(participant_id).await {
            Some(session) => session.close().await,
            None => false,
        }
    }

    /// Close every open session; returns how many were closed
    pub async fn close_all(&self) -> usize {
        let sessions: Vec<ConversationSession> =
            self.sessions.read().await.values().cloned().collect();
        let mut closed = 0;
        for session in sessions {
            if session.close().await {
                closed += 1;
            }
        }
        closed
    }

    pub async fn open_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Open conversations, most recent activity first
    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        let sessions: Vec<ConversationSession> =
            self.sessions.read().await.values().cloned().collect();

        let mut summaries: Vec<ConversationSummary> = sessions
            .iter()
            .map(|session| {
                let snapshot = session.snapshot();
                let last = snapshot
                    .messages
                    .iter()
                    .max_by_key(|m| (m.created_at, m.id));
                ConversationSummary {
                    participant_id: snapshot.participant.id.clone(),
                    display_name: snapshot.participant.display_name.clone(),
                    last_preview: last.map(|m| m.content.preview()).unwrap_or_default(),
                    last_timestamp: last.map(|m| m.created_at),
                    unread_count: snapshot.unread_count(),
                    is_typing_remote: snapshot.is_typing_remote,
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
        summaries
    }
}
