use serde::{Deserialize, Serialize};

/// What an outbound reply contains, mapped by each adapter onto the matching
/// vendor send primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Text,
    /// Image already materialized to a local path.
    Image,
    /// Image referenced by URL; the dispatcher downloads it first.
    ImageUrl,
    Video,
    VideoUrl,
    File,
    Voice,
    Card,
    /// Rich link described by a small JSON object
    /// `{name, account, title, digest, url}`.
    Link,
    Xml,
    Gif,
    /// Voice/video call nudge. Content is ignored.
    CallUp,
    /// Invite the receiver list into a group chat.
    InviteRoom,
}

impl std::fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::ImageUrl => "image_url",
            Self::Video => "video",
            Self::VideoUrl => "video_url",
            Self::File => "file",
            Self::Voice => "voice",
            Self::Card => "card",
            Self::Link => "link",
            Self::Xml => "xml",
            Self::Gif => "gif",
            Self::CallUp => "call_up",
            Self::InviteRoom => "invite_room",
        };
        f.write_str(name)
    }
}

/// A reply produced by a responder, consumed exactly once by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub kind: ReplyKind,
    pub content: String,
}

impl Reply {
    #[must_use]
    pub fn new(kind: ReplyKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(ReplyKind::Text, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_helper_sets_kind() {
        let reply = Reply::text("hello");
        assert_eq!(reply.kind, ReplyKind::Text);
        assert_eq!(reply.content, "hello");
    }

    #[test]
    fn reply_roundtrips_through_json() {
        let reply = Reply::new(ReplyKind::ImageUrl, "http://example.com/a.jpg");
        let json = serde_json::to_string(&reply).unwrap();
        let back: Reply = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reply);
    }
}
