use serde::Deserialize;

/// Vendor message-type codes for the enterprise client.
pub mod codes {
    pub const TEXT: u32 = 11041;
    pub const IMAGE: u32 = 11042;
    pub const VOICE: u32 = 11044;
    pub const MEMBER_JOINED: u32 = 11072;
}

/// CDN reference for a media payload; the client downloads and decrypts it
/// on demand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CdnRef {
    pub url: String,
    pub auth_key: String,
    pub aes_key: String,
    pub size: u64,
    pub file_id: String,
}

/// A member named in a member-joined notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinedMember {
    pub user_id: String,
    pub name: String,
}

/// A raw event as handed over by the enterprise client.
///
/// Group events carry a `R:`-prefixed conversation id; that prefix is the
/// routing hint for group vs single classification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeworkEvent {
    pub type_code: u32,
    pub conversation_id: Option<String>,
    pub room_conversation_id: Option<String>,
    /// Unix seconds; absent on some notification events.
    pub send_time: Option<i64>,
    pub sender: String,
    pub sender_name: String,
    pub content: String,
    /// Display names the client says were @-mentioned.
    pub at_list: Vec<String>,
    /// Populated for member-joined notifications.
    pub member_list: Vec<JoinedMember>,
    pub cdn: Option<CdnRef>,
}

impl WeworkEvent {
    /// The conversation this event belongs to, whichever field carries it.
    #[must_use]
    pub fn conversation(&self) -> Option<&str> {
        self.conversation_id
            .as_deref()
            .or(self.room_conversation_id.as_deref())
    }

    #[must_use]
    pub fn is_group(&self) -> bool {
        self.conversation().is_some_and(|c| c.contains("R:"))
    }
}
