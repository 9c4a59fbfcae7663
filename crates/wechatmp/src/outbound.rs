use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    tracing::{info, warn},
};

use {
    wegate_channels::{ChannelOutbound, Error, Result},
    wegate_common::{Reply, ReplyKind},
};

use crate::client::MpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    RejectedTooLarge,
}

/// Maps canonical replies onto the customer-service message API.
pub struct MpOutbound {
    client: Arc<dyn MpClient>,
    media_dir: PathBuf,
    media_max_bytes: u64,
}

impl MpOutbound {
    #[must_use]
    pub fn new(client: Arc<dyn MpClient>, media_dir: PathBuf, media_max_bytes: u64) -> Self {
        Self {
            client,
            media_dir,
            media_max_bytes,
        }
    }

    async fn dispatch(&self, reply: &Reply, receiver: &str) -> Result<Outcome> {
        match reply.kind {
            ReplyKind::Text => {
                self.client.send_text(receiver, &reply.content).await?;
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
            ReplyKind::Voice => {
                self.client
                    .send_voice(receiver, PathBuf::from(&reply.content).as_path())
                    .await?;
                Ok(Outcome::Sent)
            }
            kind => Err(Error::unsupported_reply(kind)),
        }
    }
}

#[async_trait]
impl ChannelOutbound for MpOutbound {
    async fn send(&self, reply: &Reply, receiver: &str) -> Result<()> {
        let result = self.dispatch(reply, receiver).await;
        let success = matches!(result, Ok(Outcome::Sent));
        info!(kind = %reply.kind, receiver, success, "reply dispatch outcome");
        result.map(|_| ())
    }
}
