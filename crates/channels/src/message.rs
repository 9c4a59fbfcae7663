use {
    wegate_common::{ChatType, MessageKind},
    wegate_media::LazyMedia,
};

/// Primary payload of a normalized message; which variant is populated is
/// determined by the message kind.
#[derive(Debug)]
pub enum MessageContent {
    Text(String),
    /// Deferred binary payload (image, voice, video, file, emoji).
    Media(LazyMedia),
    /// Raw structured markup kept verbatim for kinds the responder may want
    /// to inspect itself (cards, mini-programs, unknown XML).
    Xml(String),
}

impl MessageContent {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_media(&self) -> Option<&LazyMedia> {
        match self {
            Self::Media(media) => Some(media),
            _ => None,
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// The message an inbound reply is quoting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteTarget {
    pub quoted_sender_id: String,
    pub quoted_sender_name: String,
    pub quoted_text: String,
}

/// A vendor event normalized into the canonical taxonomy.
///
/// Built once per inbound event by an adapter's classifier and immutable
/// afterwards, except for the lazy media payload which materializes on
/// first consumption.
#[derive(Debug)]
pub struct NormalizedMessage {
    pub message_id: String,
    /// Unix seconds. Vendors do not always stamp events; absence means the
    /// message is treated as fresh.
    pub created_at: Option<i64>,
    pub is_group: bool,
    pub kind: MessageKind,
    pub content: MessageContent,
    /// The peer (or room) the event arrived from.
    pub sender_id: String,
    pub sender_name: String,
    /// The conversation replies go back to.
    pub conversation_id: String,
    pub conversation_name: String,
    /// In a group, the member who actually spoke; equals `sender_id` in a
    /// single chat.
    pub actual_sender_id: String,
    pub actual_sender_name: String,
    /// Whether the bot was @-mentioned.
    pub mention_flag: bool,
    pub reply_target: Option<QuoteTarget>,
}

impl NormalizedMessage {
    #[must_use]
    pub fn chat_type(&self) -> ChatType {
        if self.is_group {
            ChatType::Group
        } else {
            ChatType::Single
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}

impl Default for NormalizedMessage {
    fn default() -> Self {
        Self {
            message_id: String::new(),
            created_at: None,
            is_group: false,
            kind: MessageKind::Unsupported,
            content: MessageContent::default(),
            sender_id: String::new(),
            sender_name: String::new(),
            conversation_id: String::new(),
            conversation_name: String::new(),
            actual_sender_id: String::new(),
            actual_sender_name: String::new(),
            mention_flag: false,
            reply_target: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_type_follows_group_flag() {
        let mut msg = NormalizedMessage::default();
        assert_eq!(msg.chat_type(), ChatType::Single);
        msg.is_group = true;
        assert_eq!(msg.chat_type(), ChatType::Group);
    }

    #[test]
    fn content_accessors() {
        let content = MessageContent::Text("hi".into());
        assert_eq!(content.as_text(), Some("hi"));
        assert!(content.as_media().is_none());
    }
}
