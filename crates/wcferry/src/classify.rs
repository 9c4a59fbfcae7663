use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    regex::Regex,
    tracing::{debug, info, warn},
};

use {
    wegate_channels::{Error, MessageContent, NormalizedMessage, QuoteTarget, Result},
    wegate_common::MessageKind,
    wegate_directory::Directory,
    wegate_media::{LazyMedia, MediaSource},
};

use crate::{
    client::{SelfInfo, WcfClient},
    event::{WcfEvent, codes},
    xmlutil,
};

/// How long to keep polling the vendor client for a decrypted image.
const IMAGE_DECRYPT_ATTEMPTS: usize = 30;
const IMAGE_DECRYPT_INTERVAL: Duration = Duration::from_secs(1);

/// First-level dispatch branch per vendor type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Text,
    Image,
    Emoji,
    File,
    Voice,
    Card,
    Video,
    ShareLink,
    MiniProgram,
    SystemNote,
    System,
    SystemUnknown,
    AppMsg,
    MemberLeft,
}

/// Vendor code → branch mapping, kept as data so the full set is visible
/// (and testable) in one place.
const BRANCHES: &[(u32, Branch)] = &[
    (codes::TEXT, Branch::Text),
    (codes::IMAGE, Branch::Image),
    (codes::EMOJI, Branch::Emoji),
    (codes::FILE, Branch::File),
    (codes::VOICE, Branch::Voice),
    (codes::CARD, Branch::Card),
    (codes::VIDEO, Branch::Video),
    (codes::SHARE_LINK, Branch::ShareLink),
    (codes::MINI_PROGRAM, Branch::MiniProgram),
    (codes::SYSTEM_NOTE, Branch::SystemNote),
    (codes::SYSTEM, Branch::System),
    (codes::SYSTEM_UNKNOWN, Branch::SystemUnknown),
    (codes::APP_MSG, Branch::AppMsg),
    (codes::MEMBER_LEFT, Branch::MemberLeft),
];

fn branch_for(type_code: u32) -> Option<Branch> {
    BRANCHES
        .iter()
        .find(|(code, _)| *code == type_code)
        .map(|(_, branch)| *branch)
}

/// Ordered marker table for free-text system notices. First match wins;
/// the wording is whatever the vendor currently emits, so this is
/// best-effort by nature and everything unmatched falls back to the
/// unknown branch.
const NOTE_MARKERS: &[(&str, MessageKind)] = &[
    ("拍了拍", MessageKind::PatPat),
    ("加入", MessageKind::JoinGroup),
    ("移出了群聊", MessageKind::Kicked),
];

/// Stateless classifier for desktop WeChat events.
pub struct Classifier {
    client: Arc<dyn WcfClient>,
    directory: Arc<Directory>,
    self_info: SelfInfo,
    media_dir: PathBuf,
    media_max_bytes: u64,
}

impl Classifier {
    #[must_use]
    pub fn new(
        client: Arc<dyn WcfClient>,
        directory: Arc<Directory>,
        self_info: SelfInfo,
        media_dir: PathBuf,
        media_max_bytes: u64,
    ) -> Self {
        Self {
            client,
            directory,
            self_info,
            media_dir,
            media_max_bytes,
        }
    }

    /// Normalize one raw event.
    ///
    /// The only error is `UnsupportedMessage`; everything else degrades to
    /// an unknown-XML message rather than failing the event loop.
    pub async fn classify(&self, event: WcfEvent) -> Result<NormalizedMessage> {
        let branch = branch_for(event.type_code)
            .ok_or_else(|| Error::unsupported_message(event.type_code))?;

        let sender_name = self.directory.lookup_display_name(&event.sender).await;
        let mut msg = NormalizedMessage {
            message_id: event.id.clone(),
            created_at: event.ts,
            is_group: event.is_group(),
            sender_id: event.sender.clone(),
            sender_name: sender_name.clone(),
            conversation_id: event.sender.clone(),
            conversation_name: sender_name.clone(),
            actual_sender_id: event.sender.clone(),
            actual_sender_name: sender_name,
            ..Default::default()
        };

        match branch {
            Branch::Text => {
                // Official accounts share the text code but get their own kind.
                msg.kind = if event.sender.starts_with("gh_") {
                    MessageKind::MpArticle
                } else {
                    MessageKind::Text
                };
                msg.content = MessageContent::Text(event.content.clone());
            }
            Branch::Image => {
                msg.kind = MessageKind::Image;
                msg.content = MessageContent::Media(LazyMedia::deferred(Arc::new(ImageSource {
                    client: Arc::clone(&self.client),
                    message_id: event.id.clone(),
                    extra: event.extra.clone(),
                    dest_dir: self.media_dir.join("images"),
                })));
            }
            Branch::Emoji => self.classify_emoji(&event, &mut msg),
            Branch::File => {
                msg.kind = MessageKind::File;
                msg.content = MessageContent::Media(LazyMedia::resolved(event.extra.clone()));
            }
            Branch::Voice => match &event.audio_path {
                Some(path) => {
                    msg.kind = MessageKind::Voice;
                    msg.content = MessageContent::Media(LazyMedia::resolved(path.clone()));
                }
                None => {
                    return Err(Error::unsupported_message(format!(
                        "{} (voice without local audio)",
                        event.type_code
                    )));
                }
            },
            Branch::Card => {
                msg.kind = MessageKind::Card;
                msg.content = MessageContent::Xml(event.xml().to_string());
            }
            Branch::Video => match &event.video_path {
                Some(path) => {
                    msg.kind = MessageKind::Video;
                    msg.content = MessageContent::Media(LazyMedia::resolved(path.clone()));
                }
                None => {
                    return Err(Error::unsupported_message(format!(
                        "{} (video without local file)",
                        event.type_code
                    )));
                }
            },
            Branch::ShareLink => self.classify_share_link(&event, &mut msg),
            Branch::MiniProgram => {
                msg.kind = MessageKind::MiniProgram;
                msg.content = MessageContent::Xml(event.xml().to_string());
            }
            Branch::SystemNote => self.classify_system_note(&event, &mut msg).await,
            Branch::System => self.classify_system(&event, &mut msg),
            Branch::SystemUnknown => {
                msg.kind = MessageKind::UnknownXml;
                msg.content = MessageContent::Xml(event.xml().to_string());
            }
            Branch::AppMsg => self.classify_app_msg(&event, &mut msg),
            Branch::MemberLeft => {
                msg.kind = MessageKind::LeaveGroup;
                let name = self.directory.lookup_display_name(&event.sender).await;
                if let Some(room) = &event.room_id {
                    self.directory.remove_group_member(room, &event.sender);
                }
                msg.content = MessageContent::Text(format!("{name}退出了群聊！"));
            }
        }

        if let Some(room) = &event.room_id {
            msg.conversation_id = room.clone();
            msg.conversation_name = self.directory.lookup_display_name(room).await;
            if msg.actual_sender_name.is_empty() {
                msg.actual_sender_name =
                    self.directory.lookup_member_name(room, &event.sender).await;
            }
            msg.mention_flag = self.mention_flag(room, &event).await;
        }

        debug!(
            message_id = %msg.message_id,
            kind = %msg.kind,
            is_group = msg.is_group,
            "event classified"
        );
        Ok(msg)
    }

    fn classify_emoji(&self, event: &WcfEvent, msg: &mut NormalizedMessage) {
        msg.kind = MessageKind::Emoji;
        let cdn_url = xmlutil::first_attr(&event.content, "emoji", "cdnurl");
        match cdn_url {
            Some(url) => {
                msg.content = MessageContent::Media(LazyMedia::deferred(Arc::new(CdnSource {
                    url,
                    dest_dir: self.media_dir.join("emoji"),
                    max_bytes: self.media_max_bytes,
                })));
            }
            None => {
                // Sticker already present in the vendor's local store.
                msg.content =
                    MessageContent::Media(LazyMedia::resolved(event.extra.replace('\\', "/")));
            }
        }
    }

    /// Second-level dispatch for share-link payloads: payment notices and
    /// official-account articles hide behind the same vendor code.
    fn classify_share_link(&self, event: &WcfEvent, msg: &mut NormalizedMessage) {
        let xml = event.xml();
        let source_name = xmlutil::first_tag_text(xml, "name");
        let description = xmlutil::first_tag_text(xml, "des");

        if source_name.as_deref() == Some("微信支付") {
            msg.kind = MessageKind::PaymentNotice;
            msg.content =
                MessageContent::Text(trim_payment_info(description.as_deref().unwrap_or("")));
            return;
        }

        if event.sender.starts_with("gh_") {
            msg.kind = MessageKind::MpArticle;
            msg.content = MessageContent::Xml(xml.to_string());
            return;
        }

        match xmlutil::first_tag_text(xml, "url") {
            Some(url) if !url.is_empty() => {
                msg.kind = MessageKind::SharedLink;
                msg.content = MessageContent::Text(url);
            }
            _ => {
                msg.kind = MessageKind::UnknownXml;
                msg.content = MessageContent::Xml(xml.to_string());
            }
        }
    }

    /// Free-text system notices: join, pat-pat, leave.
    async fn classify_system_note(&self, event: &WcfEvent, msg: &mut NormalizedMessage) {
        let content = event.content.as_str();
        let kind = NOTE_MARKERS
            .iter()
            .find(|(marker, _)| content.contains(marker))
            .map(|(_, kind)| *kind)
            .unwrap_or(MessageKind::LeaveGroup);
        let names = extract_quoted(content);

        match kind {
            MessageKind::PatPat => {
                msg.kind = MessageKind::PatPat;
                msg.content = MessageContent::Text(content.to_string());
                if names.len() == 2 {
                    msg.actual_sender_name = names[0].clone();
                    if let Some(id) = self
                        .directory
                        .resolve_id_by_name(event.room_id.as_deref(), &names[0])
                    {
                        msg.actual_sender_id = id;
                    }
                    info!(
                        patter = %names[0],
                        patted = %names[1],
                        "pat-pat"
                    );
                } else if content.contains("拍了拍我") {
                    debug!("patted the bot itself");
                }
            }
            MessageKind::JoinGroup => {
                msg.kind = MessageKind::JoinGroup;
                // Invite wording quotes the inviter first, the joiner last.
                let inviter = names.first().cloned().unwrap_or_default();
                let joined = names.last().cloned().unwrap_or_default();
                if !inviter.is_empty() {
                    msg.actual_sender_name = inviter.clone();
                    if let Some(id) = self
                        .directory
                        .resolve_id_by_name(event.room_id.as_deref(), &inviter)
                    {
                        msg.actual_sender_id = id;
                    }
                }
                if let (Some(room), false) = (&event.room_id, joined.is_empty()) {
                    let member_id = self
                        .directory
                        .resolve_id_by_name(Some(room), &joined)
                        .unwrap_or_else(|| joined.clone());
                    self.directory.upsert_group_member(room, &member_id, &joined);
                }
                msg.content = MessageContent::Text(if inviter.is_empty() {
                    event.content.clone()
                } else {
                    format!("{inviter}加入了群聊！")
                });
            }
            MessageKind::Kicked => {
                self.classify_kick(event, msg, &names);
            }
            _ => {
                msg.kind = MessageKind::LeaveGroup;
                let name = names.first().cloned().unwrap_or_default();
                if !name.is_empty() {
                    msg.actual_sender_name = name.clone();
                    if let Some(id) = self
                        .directory
                        .resolve_id_by_name(event.room_id.as_deref(), &name)
                    {
                        msg.actual_sender_id = id.clone();
                        if let Some(room) = &event.room_id {
                            self.directory.remove_group_member(room, &id);
                        }
                    }
                }
                msg.content = MessageContent::Text(format!("{name}退出了群聊！"));
            }
        }
    }

    /// Structured system messages. Only the kick notice is recognized;
    /// everything else is kept as unknown XML, still extracting a quoted
    /// actor when one is present.
    fn classify_system(&self, event: &WcfEvent, msg: &mut NormalizedMessage) {
        let content = event.xml();
        let names = extract_quoted(content);
        if content.contains("移出了群聊") {
            self.classify_kick(event, msg, &names);
        } else {
            msg.kind = MessageKind::UnknownXml;
            msg.content = MessageContent::Xml(content.to_string());
            if let Some(name) = names.first() {
                msg.actual_sender_name = name.clone();
            }
        }
    }

    fn classify_kick(&self, event: &WcfEvent, msg: &mut NormalizedMessage, names: &[String]) {
        msg.kind = MessageKind::Kicked;
        let name = names.first().cloned().unwrap_or_else(|| "None".to_string());
        msg.actual_sender_name = name.clone();
        if let Some(id) = self
            .directory
            .resolve_id_by_name(event.room_id.as_deref(), &name)
        {
            msg.actual_sender_id = id.clone();
            if let Some(room) = &event.room_id {
                self.directory.remove_group_member(room, &id);
            }
        }
        msg.content = MessageContent::Text(format!("{name} 因违反群内规则，已被踢出群聊！"));
    }

    /// App messages: a nested `<type>` discriminator selects the final
    /// kind. Quote replies are the interesting case; the rest of the
    /// sub-types stay opaque XML.
    fn classify_app_msg(&self, event: &WcfEvent, msg: &mut NormalizedMessage) {
        let xml = event.xml();
        let sub_type = xmlutil::first_tag_text(xml, "type");

        match sub_type.as_deref() {
            // Channel-video share: still a share, content stays structured.
            Some("51") => {
                msg.kind = MessageKind::SharedLink;
                msg.content = MessageContent::Xml(xml.to_string());
            }
            // Music, platform cards, chat logs, embedded mini-programs,
            // stickers, live streams, favorites: opaque containers.
            Some("3" | "4" | "8" | "19" | "21" | "24" | "36" | "40" | "63") => {
                msg.kind = MessageKind::UnknownXml;
                msg.content = MessageContent::Xml(xml.to_string());
            }
            _ if xmlutil::has_tag(xml, "refermsg") => {
                msg.kind = MessageKind::Quote;
                let title = xmlutil::first_tag_text(xml, "title").unwrap_or_default();
                let quoted_sender_id = xmlutil::first_tag_text(xml, "chatusr")
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| event.sender.clone());
                let quoted_sender_name =
                    xmlutil::first_tag_text(xml, "displayname").unwrap_or_default();
                msg.content = MessageContent::Text(title);
                msg.reply_target = Some(QuoteTarget {
                    quoted_sender_id,
                    quoted_sender_name,
                    quoted_text: String::new(),
                });
            }
            other => {
                debug!(sub_type = ?other, "unrecognized app message sub-type");
                msg.kind = MessageKind::UnknownXml;
                msg.content = MessageContent::Xml(xml.to_string());
            }
        }
    }

    /// The bot counts as mentioned when the vendor's mention list names it,
    /// or when the text carries a literal `@name` followed by the narrow
    /// no-break space WeChat inserts (or a plain space, since pasted text loses
    /// the narrow one). The per-room alias is checked alongside the global
    /// profile name.
    async fn mention_flag(&self, room_id: &str, event: &WcfEvent) -> bool {
        if event.at_list.iter().any(|id| *id == self.self_info.id) {
            return true;
        }

        let mut names = vec![self.self_info.name.clone()];
        if let Some(group) = self.directory.lookup_group(room_id) {
            if let Some(me) = group.members.get(&self.self_info.id) {
                if let Some(alias) = &me.room_name {
                    if !alias.is_empty() {
                        names.push(alias.clone());
                    }
                }
            }
        }

        names
            .iter()
            .filter(|name| !name.is_empty())
            .any(|name| mentioned_in_text(&event.content, name))
    }
}

/// `@name` followed by U+2005, a regular space, or end of text.
fn mentioned_in_text(content: &str, name: &str) -> bool {
    let pattern = format!("@{}(\u{2005}|\u{0020}|$)", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(content),
        Err(e) => {
            warn!(name, error = %e, "mention pattern failed to compile");
            false
        }
    }
}

/// Contents of straight or curly double-quote pairs, in order.
fn extract_quoted(text: &str) -> Vec<String> {
    // Compilation cannot fail; the pattern is fixed.
    let re = Regex::new("\"([^\"]*)\"|“([^”]*)”").expect("static pattern");
    re.captures_iter(text)
        .filter_map(|cap| {
            cap.get(1)
                .or_else(|| cap.get(2))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Keep only the payment lines that identify the transaction: the header
/// plus the remark or origin line.
fn trim_payment_info(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() >= 3 {
        if lines[1].contains("付款方备注") {
            return lines[..2].join("\n");
        }
        if lines[1].contains("来自") {
            return lines[..3].join("\n");
        }
    }
    text.to_string()
}

/// Download-then-decrypt image fetch through the vendor client. The
/// attachment lands asynchronously, so decryption is polled.
struct ImageSource {
    client: Arc<dyn WcfClient>,
    message_id: String,
    extra: String,
    dest_dir: PathBuf,
}

#[async_trait]
impl MediaSource for ImageSource {
    async fn fetch(&self) -> wegate_media::Result<PathBuf> {
        self.client
            .download_attachment(&self.message_id, &self.extra)
            .await
            .map_err(|e| wegate_media::Error::failed(e.to_string()))?;

        for _ in 0..IMAGE_DECRYPT_ATTEMPTS {
            match self
                .client
                .decrypt_image(&self.extra, &self.dest_dir)
                .await
                .map_err(|e| wegate_media::Error::failed(e.to_string()))?
            {
                Some(path) => return Ok(path),
                None => tokio::time::sleep(IMAGE_DECRYPT_INTERVAL).await,
            }
        }
        Err(wegate_media::Error::failed(format!(
            "image attachment {} never became readable",
            self.message_id
        )))
    }

    fn describe(&self) -> String {
        format!("wcf image {}", self.message_id)
    }
}

/// Plain CDN download (stickers).
struct CdnSource {
    url: String,
    dest_dir: PathBuf,
    max_bytes: u64,
}

#[async_trait]
impl MediaSource for CdnSource {
    async fn fetch(&self) -> wegate_media::Result<PathBuf> {
        wegate_media::download_media(&self.url, &self.dest_dir, "gif", self.max_bytes).await
    }

    fn describe(&self) -> String {
        format!("cdn {}", self.url)
    }
}
