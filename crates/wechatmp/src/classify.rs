use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {async_trait::async_trait, tracing::debug};

use {
    wegate_channels::{Error, MessageContent, NormalizedMessage, Result},
    wegate_common::MessageKind,
    wegate_media::{LazyMedia, MediaSource},
};

use crate::{
    client::MpClient,
    event::{MpEvent, MpEventKind},
};

/// Normalize one webhook event. Always a single chat; the conversation is
/// the user's open id.
pub fn classify(
    event: &MpEvent,
    client: &Arc<dyn MpClient>,
    bot_name: Option<&str>,
    media_dir: &Path,
) -> Result<NormalizedMessage> {
    let mut msg = NormalizedMessage {
        message_id: event.id.clone(),
        created_at: event.time,
        is_group: false,
        sender_id: event.source.clone(),
        conversation_id: event.source.clone(),
        conversation_name: bot_name.unwrap_or("").to_string(),
        actual_sender_id: event.source.clone(),
        ..Default::default()
    };

    match event.kind {
        MpEventKind::Text => {
            msg.kind = MessageKind::Text;
            msg.content = MessageContent::Text(event.content.clone());
        }
        MpEventKind::Voice => match &event.recognition {
            // The platform already transcribed it: treat as plain text.
            Some(recognized) => {
                msg.kind = MessageKind::Text;
                msg.content = MessageContent::Text(recognized.clone());
            }
            None => {
                let media_id = require_media_id(event)?;
                msg.kind = MessageKind::Voice;
                msg.content = MessageContent::Media(LazyMedia::deferred(Arc::new(MpMedia {
                    client: Arc::clone(client),
                    media_id,
                    format: event.format.clone(),
                    dest_dir: media_dir.join("voice"),
                })));
            }
        },
        MpEventKind::Image => {
            let media_id = require_media_id(event)?;
            msg.kind = MessageKind::Image;
            msg.content = MessageContent::Media(LazyMedia::deferred(Arc::new(MpMedia {
                client: Arc::clone(client),
                media_id,
                format: Some("png".into()),
                dest_dir: media_dir.join("images"),
            })));
        }
        MpEventKind::Other => {
            return Err(Error::unsupported_message("unhandled webhook event kind"));
        }
    }

    debug!(message_id = %msg.message_id, kind = %msg.kind, "event classified");
    Ok(msg)
}

fn require_media_id(event: &MpEvent) -> Result<String> {
    event
        .media_id
        .clone()
        .ok_or_else(|| Error::unsupported_message("media event without media id"))
}

/// Deferred media download through the account API.
struct MpMedia {
    client: Arc<dyn MpClient>,
    media_id: String,
    format: Option<String>,
    dest_dir: PathBuf,
}

#[async_trait]
impl MediaSource for MpMedia {
    async fn fetch(&self) -> wegate_media::Result<PathBuf> {
        self.client
            .download_media(&self.media_id, self.format.as_deref(), &self.dest_dir)
            .await
            .map_err(|e| wegate_media::Error::failed(e.to_string()))
    }

    fn describe(&self) -> String {
        format!("mp media {}", self.media_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockClient;

    fn client() -> Arc<dyn MpClient> {
        Arc::new(MockClient::default())
    }

    fn event(kind: MpEventKind) -> MpEvent {
        MpEvent {
            id: "m1".into(),
            kind,
            time: Some(100),
            source: "openid-1".into(),
            target: "gh_acct".into(),
            content: "hello".into(),
            recognition: None,
            media_id: None,
            format: None,
        }
    }

    #[test]
    fn text_event_classifies_verbatim() {
        let msg = classify(
            &event(MpEventKind::Text),
            &client(),
            Some("assistant"),
            &PathBuf::from("/tmp"),
        )
        .unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.text(), Some("hello"));
        assert!(!msg.is_group);
        assert_eq!(msg.conversation_id, "openid-1");
    }

    #[test]
    fn recognized_voice_becomes_text() {
        let mut e = event(MpEventKind::Voice);
        e.recognition = Some("turn on the lights".into());
        let msg = classify(&e, &client(), None, &PathBuf::from("/tmp")).unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.text(), Some("turn on the lights"));
    }

    #[tokio::test]
    async fn unrecognized_voice_defers_download() {
        let mut e = event(MpEventKind::Voice);
        e.media_id = Some("media-9".into());
        e.format = Some("amr".into());
        let msg = classify(&e, &client(), None, &PathBuf::from("/tmp")).unwrap();
        assert_eq!(msg.kind, MessageKind::Voice);
        assert!(!msg.content.as_media().unwrap().is_settled().await);
    }

    #[test]
    fn image_without_media_id_is_unsupported() {
        let err = classify(
            &event(MpEventKind::Image),
            &client(),
            None,
            &PathBuf::from("/tmp"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMessage { .. }));
    }

    #[test]
    fn other_kinds_are_unsupported() {
        assert!(classify(
            &event(MpEventKind::Other),
            &client(),
            None,
            &PathBuf::from("/tmp"),
        )
        .is_err());
    }
}
