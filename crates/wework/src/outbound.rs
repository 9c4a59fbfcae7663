use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    regex::Regex,
    tracing::{error, info, warn},
};

use {
    wegate_channels::{ChannelOutbound, Error, Result},
    wegate_common::{Reply, ReplyKind},
    wegate_directory::Directory,
};

use crate::client::WeworkClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    RejectedTooLarge,
}

/// Maps canonical replies onto the enterprise client's send primitives.
///
/// The enterprise surface is narrower than the desktop one; reply kinds
/// with no primitive here are refused with `UnsupportedReply`.
pub struct WeworkOutbound {
    client: Arc<dyn WeworkClient>,
    directory: Arc<Directory>,
    media_dir: PathBuf,
    media_max_bytes: u64,
}

impl WeworkOutbound {
    #[must_use]
    pub fn new(
        client: Arc<dyn WeworkClient>,
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
                self.client
                    .send_image(receiver, PathBuf::from(&reply.content).as_path())
                    .await?;
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
                        self.client.send_video(receiver, &path).await?;
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
            ReplyKind::Video => {
                let path = PathBuf::from(&reply.content);
                if !path.exists() {
                    error!(path = %path.display(), "video file does not exist");
                    return Err(Error::malformed("video path does not exist"));
                }
                self.client.send_video(receiver, &path).await?;
                Ok(Outcome::Sent)
            }
            ReplyKind::Voice | ReplyKind::File => {
                self.client
                    .send_file(receiver, PathBuf::from(&reply.content).as_path())
                    .await?;
                Ok(Outcome::Sent)
            }
            kind => Err(Error::unsupported_reply(kind)),
        }
    }

    /// Text replies starting with `@name\n`: resolve the name against the
    /// room roster and send as a mention, stripping the `@name` prefix the
    /// client would otherwise render twice. Unresolvable names fall back
    /// to a plain send with the text untouched.
    async fn send_text_reply(&self, content: &str, receiver: &str) -> Result<()> {
        if let Some(name) = leading_mention(content) {
            if let Some(id) = self.directory.resolve_id_by_name(Some(receiver), &name) {
                let stripped = content.replacen(&format!("@{name}"), "", 1);
                return self
                    .client
                    .send_room_at_msg(receiver, stripped.trim_start(), &[id])
                    .await;
            }
        }
        self.client.send_text(receiver, content).await
    }
}

fn leading_mention(content: &str) -> Option<String> {
    let re = Regex::new(r"^@(.*?)\n").expect("static pattern");
    re.captures(content)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

#[async_trait]
impl ChannelOutbound for WeworkOutbound {
    async fn send(&self, reply: &Reply, receiver: &str) -> Result<()> {
        let result = self.dispatch(reply, receiver).await;
        let success = matches!(result, Ok(Outcome::Sent));
        info!(kind = %reply.kind, receiver, success, "reply dispatch outcome");
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use wegate_directory::{DirectoryStore, EmptySource};

    use super::*;
    use crate::testutil::{MockClient, Sent};

    fn fixture() -> (tempfile::TempDir, Arc<MockClient>, Arc<Directory>, WeworkOutbound) {
        let tmp = tempfile::tempdir().unwrap();
        let client = Arc::new(MockClient::default());
        let directory = Arc::new(
            Directory::load(Arc::new(EmptySource), DirectoryStore::new(tmp.path())).unwrap(),
        );
        let outbound = WeworkOutbound::new(
            Arc::clone(&client) as Arc<dyn WeworkClient>,
            Arc::clone(&directory),
            tmp.path().to_path_buf(),
            1024,
        );
        (tmp, client, directory, outbound)
    }

    #[tokio::test]
    async fn mention_reply_strips_prefix_and_resolves_id() {
        let (_tmp, client, directory, outbound) = fixture();
        directory.upsert_group_member("R:1", "alice-id", "Alice");

        outbound
            .send(&Reply::text("@Alice\nsee you at 5"), "R:1")
            .await
            .unwrap();
        assert_eq!(client.sent(), vec![Sent::RoomAt {
            receiver: "R:1".into(),
            text: "see you at 5".into(),
            mention_ids: vec!["alice-id".into()],
        }]);
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let (_tmp, client, _directory, outbound) = fixture();
        outbound.send(&Reply::text("hi"), "S:9").await.unwrap();
        assert_eq!(client.sent(), vec![Sent::Text {
            receiver: "S:9".into(),
            text: "hi".into(),
        }]);
    }

    #[tokio::test]
    async fn unsupported_reply_kind_is_surfaced() {
        let (_tmp, client, _directory, outbound) = fixture();
        let reply = Reply::new(ReplyKind::Card, "<xml/>");
        let err = outbound.send(&reply, "S:9").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedReply { .. }));
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_video_path_is_an_error() {
        let (_tmp, client, _directory, outbound) = fixture();
        let reply = Reply::new(ReplyKind::Video, "/definitely/not/here.mp4");
        assert!(outbound.send(&reply, "S:9").await.is_err());
        assert!(client.sent().is_empty());
    }
}
