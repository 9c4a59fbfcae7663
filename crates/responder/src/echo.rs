use {
    async_trait::async_trait,
    tracing::info,
    wegate_channels::{MsgContext, Responder},
    wegate_common::{MessageKind, Reply},
};

/// Echoes text messages back and stays quiet on everything else.
pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn reply(&self, ctx: &MsgContext) -> anyhow::Result<Option<Reply>> {
        info!(
            kind = %ctx.kind,
            receiver = %ctx.receiver,
            session_id = %ctx.session_id,
            sender = %ctx.message.actual_sender_name,
            "incoming message"
        );

        if ctx.kind != MessageKind::Text {
            return Ok(None);
        }
        // In a group, only speak when spoken to.
        if ctx.is_group && !ctx.message.mention_flag {
            return Ok(None);
        }

        Ok(ctx.message.text().map(Reply::text))
    }
}

#[cfg(test)]
mod tests {
    use wegate_channels::{MessageContent, NormalizedMessage};

    use super::*;

    fn text_context(text: &str, is_group: bool, mention: bool) -> MsgContext {
        MsgContext::from_message(NormalizedMessage {
            kind: MessageKind::Text,
            content: MessageContent::Text(text.into()),
            is_group,
            mention_flag: mention,
            sender_id: "u1".into(),
            conversation_id: if is_group { "room1".into() } else { "u1".into() },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn echoes_single_chat_text() {
        let reply = EchoResponder
            .reply(&text_context("hello", false, false))
            .await
            .unwrap();
        assert_eq!(reply, Some(Reply::text("hello")));
    }

    #[tokio::test]
    async fn stays_quiet_in_group_without_mention() {
        let reply = EchoResponder
            .reply(&text_context("hello", true, false))
            .await
            .unwrap();
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn replies_in_group_when_mentioned() {
        let reply = EchoResponder
            .reply(&text_context("hello", true, true))
            .await
            .unwrap();
        assert_eq!(reply, Some(Reply::text("hello")));
    }
}
