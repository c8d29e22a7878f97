/// Reply simulator: Idle -> TypingWindow -> Reply after every local send
use crate::chat_types::MessageContent;
use crate::config::ChatConfig;
use crate::session::{Conversation, SessionCore};
use crate::simulator::jitter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::debug;

/// Timing and content of one simulated reply, drawn when the send happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPlan {
    /// Idle time before the remote starts typing
    pub typing_delay: Duration,
    /// Length of the typing window
    pub reply_delay: Duration,
    pub text: String,
}

impl ReplyPlan {
    pub(crate) fn draw(conv: &mut Conversation, config: &ChatConfig) -> Self {
        let typing_delay = jitter(
            &mut conv.rng,
            config.reply_typing_delay_min,
            config.reply_typing_delay_max,
        );
        let reply_delay = jitter(&mut conv.rng, config.reply_delay_min, config.reply_delay_max);
        Self {
            typing_delay,
            reply_delay,
            text: conv.pick_text(&config.reply_pool),
        }
    }

    pub fn total(&self) -> Duration {
        self.typing_delay + self.reply_delay
    }
}

pub(crate) async fn schedule_reply(core: &Arc<SessionCore>, plan: ReplyPlan) {
    // Absolute deadlines keep both phases anchored to the send
    let typing_at = Instant::now() + plan.typing_delay;
    let reply_at = typing_at + plan.reply_delay;
    let task_core = core.clone();

    let scheduled = core
        .timers
        .spawn(async move {
            sleep_until(typing_at).await;
            if task_core.mutate(|conv| conv.reply_typing += 1).await.is_none() {
                debug!("Reply for {} dropped: session closed", task_core.participant_id);
                return;
            }

            sleep_until(reply_at).await;
            let delivered = task_core
                .mutate(|conv| {
                    conv.reply_typing = conv.reply_typing.saturating_sub(1);
                    conv.push_message(
                        MessageContent::text(plan.text),
                        false,
                        true,
                        task_core.now(),
                        false,
                    )
                })
                .await;
            match delivered {
                Some(message) => debug!(
                    "Reply {} delivered from {}",
                    message.id, task_core.participant_id
                ),
                None => debug!("Reply for {} dropped: session closed", task_core.participant_id),
            }
        })
        .await;

    if !scheduled {
        debug!("Reply for {} not scheduled: session closed", core.participant_id);
    }
}

/// Attachment acknowledgement: fixed delay, no typing window
pub(crate) async fn schedule_ack(core: &Arc<SessionCore>, delay: Duration, text: String) {
    let task_core = core.clone();
    let scheduled = core
        .timers
        .spawn(async move {
            sleep(delay).await;
            let delivered = task_core
                .mutate(|conv| {
                    conv.push_message(MessageContent::text(text), false, true, task_core.now(), false)
                })
                .await;
            if delivered.is_none() {
                debug!("Acknowledgement for {} dropped: session closed", task_core.participant_id);
            }
        })
        .await;

    if !scheduled {
        debug!("Acknowledgement for {} not scheduled: session closed", core.participant_id);
    }
}
