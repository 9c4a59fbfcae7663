use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    regex::Regex,
    tracing::{debug, warn},
};

use {
    wegate_channels::{Error, MessageContent, NormalizedMessage, Result},
    wegate_common::MessageKind,
    wegate_directory::Directory,
    wegate_media::{LazyMedia, MediaSource},
};

use crate::{
    client::{LoginInfo, WeworkClient},
    event::{CdnRef, WeworkEvent, codes},
};

/// Placeholder strings the client substitutes for content it cannot
/// render. They carry no usable payload.
const UNRENDERABLE_MARKERS: &[&str] = &["该消息类型暂不能展示", "不支持的消息类型"];

/// Stateless classifier for enterprise WeChat events.
pub struct Classifier {
    client: Arc<dyn WeworkClient>,
    directory: Arc<Directory>,
    login: LoginInfo,
    media_dir: PathBuf,
}

impl Classifier {
    #[must_use]
    pub fn new(
        client: Arc<dyn WeworkClient>,
        directory: Arc<Directory>,
        login: LoginInfo,
        media_dir: PathBuf,
    ) -> Self {
        Self {
            client,
            directory,
            login,
            media_dir,
        }
    }

    /// Normalize one raw event. `UnsupportedMessage` is the only error.
    pub async fn classify(&self, event: WeworkEvent) -> Result<NormalizedMessage> {
        let Some(conversation) = event.conversation().map(str::to_string) else {
            return Err(Error::unsupported_message("event without conversation id"));
        };
        let is_group = event.is_group();

        let mut msg = NormalizedMessage {
            // The enterprise client does not expose a message id; the
            // conversation id is the closest stable handle.
            message_id: conversation.clone(),
            created_at: event.send_time,
            is_group,
            sender_id: event.sender.clone(),
            sender_name: event.sender_name.clone(),
            conversation_id: conversation.clone(),
            conversation_name: event.sender_name.clone(),
            actual_sender_id: event.sender.clone(),
            actual_sender_name: event.sender_name.clone(),
            ..Default::default()
        };

        match event.type_code {
            codes::TEXT => {
                if UNRENDERABLE_MARKERS
                    .iter()
                    .any(|marker| event.content.contains(marker))
                {
                    return Err(Error::unsupported_message("unrenderable text placeholder"));
                }
                msg.kind = MessageKind::Text;
                msg.content = MessageContent::Text(event.content.clone());
            }
            codes::IMAGE => {
                let cdn = require_cdn(&event)?;
                msg.kind = MessageKind::Image;
                msg.content = MessageContent::Media(LazyMedia::deferred(Arc::new(CdnMedia {
                    client: Arc::clone(&self.client),
                    cdn,
                    dest_dir: self.media_dir.join("images"),
                    voice: false,
                })));
            }
            codes::VOICE => {
                let cdn = require_cdn(&event)?;
                msg.kind = MessageKind::Voice;
                msg.content = MessageContent::Media(LazyMedia::deferred(Arc::new(CdnMedia {
                    client: Arc::clone(&self.client),
                    cdn,
                    dest_dir: self.media_dir.join("voice"),
                    voice: true,
                })));
            }
            codes::MEMBER_JOINED => {
                msg.kind = MessageKind::JoinGroup;
                match event.member_list.first() {
                    Some(member) => {
                        msg.actual_sender_id = member.user_id.clone();
                        msg.actual_sender_name = member.name.clone();
                        msg.content =
                            MessageContent::Text(format!("{}加入了群聊！", member.name));
                        self.directory
                            .upsert_group_member(&conversation, &member.user_id, &member.name);
                        // The roster beyond this one member changed too;
                        // resync in the background rather than holding up
                        // the event.
                        let directory = Arc::clone(&self.directory);
                        tokio::spawn(async move { directory.refresh_groups().await });
                    }
                    None => {
                        warn!("member-joined event without member list");
                        msg.content = MessageContent::Text(event.content.clone());
                    }
                }
            }
            other => return Err(Error::unsupported_message(other)),
        }

        if is_group {
            msg.conversation_name = self.directory.lookup_display_name(&conversation).await;
            msg.mention_flag = self.mention_flag(&event);
        }

        debug!(
            message_id = %msg.message_id,
            kind = %msg.kind,
            is_group,
            "event classified"
        );
        Ok(msg)
    }

    /// The enterprise mention list carries display names, not ids. The
    /// text fallback catches pasted messages that never made it into the
    /// list.
    fn mention_flag(&self, event: &WeworkEvent) -> bool {
        let name = self.login.display_name();
        if name.is_empty() {
            return false;
        }
        if event.at_list.iter().any(|n| n == name) {
            return true;
        }
        let pattern = format!("@{}(?:[\u{2005}\u{0020}]|$)", regex::escape(name));
        Regex::new(&pattern)
            .map(|re| re.is_match(&event.content))
            .unwrap_or(false)
    }
}

fn require_cdn(event: &WeworkEvent) -> Result<CdnRef> {
    event
        .cdn
        .clone()
        .ok_or_else(|| Error::unsupported_message("media event without cdn reference"))
}

/// CDN fetch through the enterprise client, optionally transcoding voice.
struct CdnMedia {
    client: Arc<dyn WeworkClient>,
    cdn: CdnRef,
    dest_dir: PathBuf,
    voice: bool,
}

#[async_trait]
impl MediaSource for CdnMedia {
    async fn fetch(&self) -> wegate_media::Result<PathBuf> {
        let result = if self.voice {
            self.client.download_voice(&self.cdn, &self.dest_dir).await
        } else {
            self.client.download_media(&self.cdn, &self.dest_dir).await
        };
        result.map_err(|e| wegate_media::Error::failed(e.to_string()))
    }

    fn describe(&self) -> String {
        format!("cdn file {}", self.cdn.file_id)
    }
}
