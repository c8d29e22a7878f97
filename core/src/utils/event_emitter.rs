/// Event emitter for view layers and monitoring
use crate::chat_types::ChatEvent;
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CAPACITY: usize = 256;

pub struct EventEmitter {
    sender: broadcast::Sender<ChatEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    /// Fire-and-forget; having no subscribers is normal
    pub fn emit(&self, event: ChatEvent) {
        if self.sender.send(event).is_err() {
            trace!("chat event dropped: no subscribers");
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventEmitter {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
