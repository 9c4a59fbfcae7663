use serde::{Deserialize, Serialize};

/// Whether a conversation is a one-on-one chat or a group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Single,
    Group,
}

/// Canonical classification of an inbound message.
///
/// Vendor adapters map their numeric type codes onto this closed set; exactly
/// one kind is assigned per message and the kind determines which content
/// variant is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Voice,
    Video,
    File,
    Emoji,
    Card,
    MiniProgram,
    SharedLink,
    /// Article pushed by a subscribed official account.
    MpArticle,
    /// A reply quoting an earlier message.
    Quote,
    JoinGroup,
    LeaveGroup,
    /// A member was removed by an admin (distinct from leaving voluntarily).
    Kicked,
    PatPat,
    PaymentNotice,
    /// Structured payload with an unrecognized discriminator. Kept rather
    /// than rejected so new vendor sub-types degrade instead of erroring.
    UnknownXml,
    Unsupported,
}

impl MessageKind {
    /// Kinds whose content is a media reference requiring materialization.
    #[must_use]
    pub fn is_media(self) -> bool {
        matches!(
            self,
            Self::Image | Self::Voice | Self::Video | Self::File | Self::Emoji
        )
    }

    /// Group bookkeeping events produced by the platform, not a user.
    #[must_use]
    pub fn is_system(self) -> bool {
        matches!(
            self,
            Self::JoinGroup | Self::LeaveGroup | Self::Kicked | Self::PatPat
        )
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::File => "file",
            Self::Emoji => "emoji",
            Self::Card => "card",
            Self::MiniProgram => "mini_program",
            Self::SharedLink => "shared_link",
            Self::MpArticle => "mp_article",
            Self::Quote => "quote",
            Self::JoinGroup => "join_group",
            Self::LeaveGroup => "leave_group",
            Self::Kicked => "kicked",
            Self::PatPat => "pat_pat",
            Self::PaymentNotice => "payment_notice",
            Self::UnknownXml => "unknown_xml",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}
