use std::sync::Arc;

use {
    rand::Rng,
    tracing::{debug, info, warn},
    wegate_common::{MessageKind, Reply},
};

use crate::{
    Error,
    context::MsgContext,
    message::NormalizedMessage,
    plugin::{ChannelOutbound, Responder},
};

/// Messages older than this (by their own timestamp) are replays from a
/// reconnect and are dropped before any handling.
const STALE_AFTER_SECS: i64 = 60;

/// True when a timestamped message is past the staleness window.
/// Messages without a timestamp are always fresh.
#[must_use]
pub fn is_stale(created_at: Option<i64>, now: i64) -> bool {
    match created_at {
        Some(ts) => now - ts > STALE_AFTER_SECS,
        None => false,
    }
}

/// Per-channel conversation router.
///
/// Every accepted event is handled on its own task after a small random
/// delay, which keeps a busy group from firing a burst of vendor calls in
/// the same instant. Ordering across conversations is not guaranteed, and
/// ordering within one conversation is best effort only.
pub struct Router {
    responder: Arc<dyn Responder>,
    outbound: Arc<dyn ChannelOutbound>,
    /// Forward voice messages to the responder. Off by default; vetoes the
    /// context when disabled.
    speech_recognition: bool,
}

impl Router {
    #[must_use]
    pub fn new(
        responder: Arc<dyn Responder>,
        outbound: Arc<dyn ChannelOutbound>,
        speech_recognition: bool,
    ) -> Self {
        Self {
            responder,
            outbound,
            speech_recognition,
        }
    }

    /// Accept one inbound message: staleness filter, then a jittered task.
    pub fn route(&self, msg: NormalizedMessage) {
        let now = unix_now();
        if is_stale(msg.created_at, now) {
            debug!(message_id = %msg.message_id, "history message skipped");
            return;
        }

        let responder = Arc::clone(&self.responder);
        let outbound = Arc::clone(&self.outbound);
        let speech_recognition = self.speech_recognition;
        tokio::spawn(async move {
            let delay = {
                let mut rng = rand::rng();
                rng.random_range(1..=2)
            };
            tokio::time::sleep(std::time::Duration::from_secs(delay)).await;
            Self::run(responder, outbound, speech_recognition, msg).await;
        });
    }

    /// Handle one message to completion (the body of the routed task).
    pub async fn handle(&self, msg: NormalizedMessage) {
        Self::run(
            Arc::clone(&self.responder),
            Arc::clone(&self.outbound),
            self.speech_recognition,
            msg,
        )
        .await;
    }

    async fn run(
        responder: Arc<dyn Responder>,
        outbound: Arc<dyn ChannelOutbound>,
        speech_recognition: bool,
        msg: NormalizedMessage,
    ) {
        match msg.kind {
            MessageKind::JoinGroup
            | MessageKind::LeaveGroup
            | MessageKind::Kicked
            | MessageKind::PatPat => {
                info!(kind = %msg.kind, conversation = %msg.conversation_id, "note message");
            }
            kind => {
                debug!(
                    kind = %kind,
                    conversation = %msg.conversation_id,
                    is_group = msg.is_group,
                    "inbound message"
                );
            }
        }

        let Some(ctx) = compose(speech_recognition, msg) else {
            return;
        };

        let reply = match responder.reply(&ctx).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                warn!(receiver = %ctx.receiver, error = %e, "responder failed");
                return;
            }
        };

        match outbound.send(&reply, &ctx.receiver).await {
            Ok(()) => {}
            Err(Error::UnsupportedReply { kind }) => {
                warn!(receiver = %ctx.receiver, %kind, "reply kind not supported by channel");
            }
            Err(e) => {
                warn!(receiver = %ctx.receiver, error = %e, "reply dispatch failed");
                // Best-effort notice; there is nothing more to do if this
                // fails as well.
                let notice = Reply::text("Something went wrong sending the reply.");
                if let Err(e) = outbound.send(&notice, &ctx.receiver).await {
                    debug!(receiver = %ctx.receiver, error = %e, "error notice failed too");
                }
            }
        }
    }
}

/// Build the responder context, or veto delivery.
fn compose(speech_recognition: bool, msg: NormalizedMessage) -> Option<MsgContext> {
    match msg.kind {
        MessageKind::Voice if !speech_recognition => {
            debug!(message_id = %msg.message_id, "voice message dropped, recognition off");
            None
        }
        MessageKind::Unsupported => None,
        _ => Some(MsgContext::from_message(msg)),
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
