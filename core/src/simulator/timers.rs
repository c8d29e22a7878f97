/// Ownership of a session's pending timers
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Timers that must never run twice at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    PresenceLoop,
    PresenceEpisode,
}

#[derive(Default)]
struct Slots {
    keyed: HashMap<TimerKey, JoinHandle<()>>,
    one_shot: Vec<JoinHandle<()>>,
    closed: bool,
}

impl Slots {
    /// Forget handles whose task already ran to completion
    fn prune(&mut self) {
        self.keyed.retain(|_, h| !h.is_finished());
        self.one_shot.retain(|h| !h.is_finished());
    }
}

/// Every task spawned through a `TimerSet` is aborted by `cancel_all`.
/// Once cancelled, the set refuses new work.
#[derive(Clone, Default)]
pub struct TimerSet {
    slots: Arc<Mutex<Slots>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a one-shot timer. Returns false if the set is already cancelled.
    pub async fn spawn<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slots = self.slots.lock().await;
        if slots.closed {
            return false;
        }
        slots.prune();
        slots.one_shot.push(tokio::spawn(fut));
        true
    }

    /// Spawn under `key`, aborting whatever currently holds it
    pub async fn spawn_keyed<F>(&self, key: TimerKey, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slots = self.slots.lock().await;
        if slots.closed {
            return false;
        }
        if let Some(previous) = slots.keyed.insert(key, tokio::spawn(fut)) {
            previous.abort();
        }
        true
    }

    pub async fn is_active(&self, key: TimerKey) -> bool {
        let slots = self.slots.lock().await;
        slots.keyed.get(&key).is_some_and(|h| !h.is_finished())
    }

    /// Number of timers that have not fired yet
    pub async fn pending(&self) -> usize {
        let mut slots = self.slots.lock().await;
        slots.prune();
        slots.keyed.len() + slots.one_shot.len()
    }

    pub async fn is_cancelled(&self) -> bool {
        self.slots.lock().await.closed
    }

    /// Abort everything and close the set. Returns how many timers were still pending.
    pub async fn cancel_all(&self) -> usize {
        let mut guard = self.slots.lock().await;
        let slots = &mut *guard;
        slots.closed = true;
        let mut cancelled = 0;
        for handle in slots.keyed.drain().map(|(_, h)| h).chain(slots.one_shot.drain(..)) {
            if !handle.is_finished() {
                cancelled += 1;
            }
            handle.abort();
        }
        cancelled
    }
}
