/// Presence simulator: random remote typing episodes while a conversation is open
use crate::session::SessionCore;
use crate::simulator::{jitter, TimerKey};
use rand::Rng;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::debug;

/// Start the presence loop unless it is already running
pub(crate) async fn ensure_started(core: &Arc<SessionCore>) {
    if core.timers.is_active(TimerKey::PresenceLoop).await {
        return;
    }
    let period = core.config.presence_interval;
    if core
        .timers
        .spawn_keyed(TimerKey::PresenceLoop, run(Arc::downgrade(core), period))
        .await
    {
        debug!("Presence simulator started for {}", core.participant_id);
    }
}

/// The loop holds only a weak reference, so a dropped session stops it too
async fn run(weak: Weak<SessionCore>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(core) = weak.upgrade() else {
            break;
        };

        let config = &core.config;
        let decision = core
            .mutate(|conv| {
                if conv.store.is_empty() {
                    return None;
                }
                conv.rng
                    .gen_bool(config.presence_probability)
                    .then(|| jitter(&mut conv.rng, config.presence_typing_min, config.presence_typing_max))
            })
            .await;

        match decision {
            None => break,
            Some(None) => continue,
            Some(Some(duration)) => {
                start_episode(&core, duration).await;
            }
        }
    }
}

/// Set the remote typing flag for `duration`. An episode already running is
/// reset to the new end time instead of stacking a second one.
/// `None` if the session is closed, `Some(false)` if the conversation is empty.
pub(crate) async fn start_episode(core: &Arc<SessionCore>, duration: Duration) -> Option<bool> {
    let started = core
        .mutate(|conv| {
            if conv.store.is_empty() {
                return None;
            }
            Some(std::mem::replace(&mut conv.presence_typing, true))
        })
        .await?;
    let Some(was_typing) = started else {
        debug!("No typing episode for {}: conversation is empty", core.participant_id);
        return Some(false);
    };

    let end = core.clone();
    let scheduled = core
        .timers
        .spawn_keyed(TimerKey::PresenceEpisode, async move {
            sleep(duration).await;
            end.mutate(|conv| conv.presence_typing = false).await;
        })
        .await;

    if was_typing {
        debug!("Typing episode for {} reset to {:?}", core.participant_id, duration);
    } else {
        debug!("Typing episode for {} started ({:?})", core.participant_id, duration);
    }
    Some(scheduled)
}
