use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    base64::Engine,
    regex::Regex,
    tracing::{info, warn},
};

use {
    wegate_channels::{ChannelOutbound, Error, Result},
    wegate_common::{Reply, ReplyKind},
    wegate_directory::Directory,
    wegate_media::TempMedia,
};

use crate::client::{RichLink, WcfClient};

/// How a dispatch attempt ended, for the outcome log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    /// Media over the byte ceiling: rejected, fallback notice sent.
    RejectedTooLarge,
}

/// Maps canonical replies onto the desktop client's send primitives.
pub struct WcfOutbound {
    client: Arc<dyn WcfClient>,
    directory: Arc<Directory>,
    media_dir: PathBuf,
    media_max_bytes: u64,
}

impl WcfOutbound {
    #[must_use]
    pub fn new(
        client: Arc<dyn WcfClient>,
        directory: Arc<Directory>,
        media_dir: PathBuf,
        media_max_bytes: u64,
    ) -> Self {
        Self {
            client,
            directory,
            media_dir,
            media_max_bytes,
        }
    }

    async fn dispatch(&self, reply: &Reply, receiver: &str) -> Result<Outcome> {
        match reply.kind {
            ReplyKind::Text => {
                self.send_text_reply(&reply.content, receiver).await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::Image => {
                self.send_image_reply(&reply.content, receiver).await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::ImageUrl => {
                let dir = self.media_dir.join("images");
                match wegate_media::download_image(&reply.content, &dir, self.media_max_bytes)
                    .await
                {
                    Ok(path) => {
                        self.client.send_image(receiver, &path).await?;
                        Ok(Outcome::Sent)
                    }
                    Err(e) if e.is_too_large() => {
                        warn!(url = %reply.content, error = %e, "image over size ceiling");
                        self.client
                            .send_text(receiver, "抱歉，图片太大了！！！")
                            .await?;
                        Ok(Outcome::RejectedTooLarge)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            ReplyKind::VideoUrl => {
                let dir = self.media_dir.join("videos");
                match wegate_media::download_media(
                    &reply.content,
                    &dir,
                    "mp4",
                    self.media_max_bytes,
                )
                .await
                {
                    Ok(path) => {
                        self.client.send_file(receiver, &path).await?;
                        Ok(Outcome::Sent)
                    }
                    Err(e) if e.is_too_large() => {
                        warn!(url = %reply.content, error = %e, "video over size ceiling");
                        self.client
                            .send_text(receiver, "抱歉，视频太大了！！！")
                            .await?;
                        Ok(Outcome::RejectedTooLarge)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            ReplyKind::Video | ReplyKind::File | ReplyKind::Voice => {
                self.client
                    .send_file(receiver, PathBuf::from(&reply.content).as_path())
                    .await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::Gif => {
                self.client
                    .send_gif(receiver, PathBuf::from(&reply.content).as_path())
                    .await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::Card => {
                self.client.send_card(receiver, &reply.content).await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::Link => {
                let link: RichLink = serde_json::from_str(&reply.content)?;
                self.client.send_rich_link(receiver, &link).await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::Xml => {
                self.client.send_xml(receiver, &reply.content).await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::CallUp => {
                self.client.send_call_up(receiver).await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::InviteRoom => {
                let member_ids: Vec<String> = serde_json::from_str(&reply.content)?;
                self.client
                    .invite_room_members(receiver, &member_ids)
                    .await?;
                Ok(Outcome::Sent)
            }
        }
    }

    /// Text replies starting with `@name\n` become a mention-send when the
    /// name resolves to a room member; otherwise the text goes out as-is.
    async fn send_text_reply(&self, content: &str, receiver: &str) -> Result<()> {
        if let Some(name) = leading_mention(content) {
            if let Some(id) = self.directory.resolve_id_by_name(Some(receiver), &name) {
                return self
                    .client
                    .send_mention_text(receiver, content, &[id])
                    .await;
            }
        }
        self.client.send_text(receiver, content).await
    }

    /// Image replies carry either a local path or a `data:` URI.
    ///
    /// Data URIs go through a scoped temp file that is removed when this
    /// returns, whether or not the send succeeded; a lingering vendor file
    /// handle degrades to a warning inside the guard.
    async fn send_image_reply(&self, content: &str, receiver: &str) -> Result<()> {
        if let Some(bytes) = decode_data_uri(content)? {
            let temp = TempMedia::write(&bytes, ".jpg")?;
            return self.client.send_image(receiver, temp.path()).await;
        }
        self.client
            .send_image(receiver, PathBuf::from(content).as_path())
            .await
    }
}

/// Decode `data:<mime>;base64,<data>` payloads; `Ok(None)` for anything
/// that is not a data URI.
fn decode_data_uri(content: &str) -> Result<Option<Vec<u8>>> {
    if !content.starts_with("data:") {
        return Ok(None);
    }
    let Some(comma) = content.find(',') else {
        return Err(Error::malformed("data URI without comma separator"));
    };
    base64::engine::general_purpose::STANDARD
        .decode(&content[comma + 1..])
        .map(Some)
        .map_err(|e| Error::malformed(format!("data URI base64: {e}")))
}

/// The `name` in a leading `@name\n` line, if present.
fn leading_mention(content: &str) -> Option<String> {
    // Anchored variant of the reply convention: "@name\nrest of text".
    let re = Regex::new(r"^@(.*?)\n").expect("static pattern");
    re.captures(content)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

#[async_trait]
impl ChannelOutbound for WcfOutbound {
    async fn send(&self, reply: &Reply, receiver: &str) -> Result<()> {
        let result = self.dispatch(reply, receiver).await;
        let success = matches!(result, Ok(Outcome::Sent));
        info!(kind = %reply.kind, receiver, success, "reply dispatch outcome");
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use wegate_directory::{Directory, DirectoryStore, EmptySource};

    use super::*;
    use crate::testutil::{MockClient, Sent};

    fn fixture() -> (tempfile::TempDir, Arc<MockClient>, Arc<Directory>, WcfOutbound) {
        let tmp = tempfile::tempdir().unwrap();
        let client = Arc::new(MockClient::default());
        let directory = Arc::new(
            Directory::load(Arc::new(EmptySource), DirectoryStore::new(tmp.path())).unwrap(),
        );
        let outbound = WcfOutbound::new(
            Arc::clone(&client) as Arc<dyn WcfClient>,
            Arc::clone(&directory),
            tmp.path().to_path_buf(),
            1024,
        );
        (tmp, client, directory, outbound)
    }

    #[tokio::test]
    async fn plain_text_goes_out_verbatim() {
        let (_tmp, client, _directory, outbound) = fixture();
        outbound.send(&Reply::text("hi"), "u1").await.unwrap();
        assert_eq!(client.sent(), vec![Sent::Text {
            receiver: "u1".into(),
            text: "hi".into(),
        }]);
    }

    #[tokio::test]
    async fn leading_at_name_resolves_to_mention_send() {
        let (_tmp, client, directory, outbound) = fixture();
        directory.upsert_group_member("room1", "alice-id", "Alice");

        outbound
            .send(&Reply::text("@Alice\nhello"), "room1")
            .await
            .unwrap();
        assert_eq!(client.sent(), vec![Sent::MentionText {
            receiver: "room1".into(),
            text: "@Alice\nhello".into(),
            mention_ids: vec!["alice-id".into()],
        }]);
    }

    #[tokio::test]
    async fn unresolvable_mention_falls_back_to_plain_send() {
        let (_tmp, client, _directory, outbound) = fixture();
        outbound
            .send(&Reply::text("@Nobody\nhello"), "room1")
            .await
            .unwrap();
        assert!(matches!(client.sent()[0], Sent::Text { .. }));
    }

    #[tokio::test]
    async fn oversized_image_url_sends_notice_and_no_image() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/huge.jpg")
            .with_body(vec![0u8; 8192])
            .create_async()
            .await;

        let (_tmp, client, _directory, outbound) = fixture();
        let reply = Reply::new(ReplyKind::ImageUrl, format!("{}/huge.jpg", server.url()));
        outbound.send(&reply, "u1").await.unwrap();

        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert!(
            matches!(&sent[0], Sent::Text { text, .. } if text.contains("太大")),
            "expected a size notice, got {sent:?}"
        );
    }

    #[tokio::test]
    async fn oversized_video_url_sends_notice_and_no_file() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/huge.mp4")
            .with_body(vec![0u8; 8192])
            .create_async()
            .await;

        let (_tmp, client, _directory, outbound) = fixture();
        let reply = Reply::new(ReplyKind::VideoUrl, format!("{}/huge.mp4", server.url()));
        outbound.send(&reply, "u1").await.unwrap();

        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::Text { text, .. } if text.contains("太大")));
    }

    #[tokio::test]
    async fn rich_link_decodes_json_payload() {
        let (_tmp, client, _directory, outbound) = fixture();
        let reply = Reply::new(
            ReplyKind::Link,
            r#"{"name":"n","account":"a","title":"today","digest":"d","url":"https://x"}"#,
        );
        outbound.send(&reply, "u1").await.unwrap();
        assert_eq!(client.sent(), vec![Sent::RichLink {
            receiver: "u1".into(),
            title: "today".into(),
        }]);
    }

    #[tokio::test]
    async fn invite_room_takes_member_id_list() {
        let (_tmp, client, _directory, outbound) = fixture();
        let reply = Reply::new(ReplyKind::InviteRoom, r#"["u1","u2"]"#);
        outbound.send(&reply, "room1").await.unwrap();
        assert_eq!(client.sent(), vec![Sent::Invite {
            room_id: "room1".into(),
            member_ids: vec!["u1".into(), "u2".into()],
        }]);
    }

    #[tokio::test]
    async fn data_uri_image_goes_through_a_temp_file_that_is_cleaned_up() {
        let (_tmp, client, _directory, outbound) = fixture();
        let payload = base64::engine::general_purpose::STANDARD.encode(b"fake jpeg bytes");
        let reply = Reply::new(ReplyKind::Image, format!("data:image/jpeg;base64,{payload}"));
        outbound.send(&reply, "u1").await.unwrap();

        let sent = client.sent();
        let Sent::Image { receiver, path } = &sent[0] else {
            panic!("expected image send, got {sent:?}");
        };
        assert_eq!(receiver, "u1");
        assert!(!path.exists(), "temp file must be gone after the send");
    }

    #[tokio::test]
    async fn malformed_data_uri_is_rejected() {
        let (_tmp, client, _directory, outbound) = fixture();
        let reply = Reply::new(ReplyKind::Image, "data:image/jpeg;base64");
        assert!(outbound.send(&reply, "u1").await.is_err());
        assert!(client.sent().is_empty());
    }

    #[test]
    fn leading_mention_requires_newline() {
        assert_eq!(leading_mention("@Alice\nhi").as_deref(), Some("Alice"));
        assert_eq!(leading_mention("@Alice hi"), None);
        assert_eq!(leading_mention("hi @Alice\n"), None);
    }
}
