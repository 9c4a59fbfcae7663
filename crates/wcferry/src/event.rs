use serde::Deserialize;

/// Vendor message-type codes as delivered by the automation client.
///
/// Only the semantic mapping matters; the numeric values are kept solely to
/// decode what the vendor sends.
pub mod codes {
    pub const TEXT: u32 = 1;
    pub const IMAGE: u32 = 3;
    pub const FRIEND_REQUEST: u32 = 37;
    pub const EMOJI: u32 = 47;
    pub const FILE: u32 = 49;
    /// Join / pat-pat / leave notices, free text.
    pub const SYSTEM_NOTE: u32 = 10000;
    pub const VOICE: u32 = 11048;
    pub const CARD: u32 = 11050;
    pub const VIDEO: u32 = 11051;
    pub const SHARE_LINK: u32 = 11054;
    pub const MINI_PROGRAM: u32 = 11056;
    /// System messages with structured-ish free text (kick notices).
    pub const SYSTEM: u32 = 11058;
    pub const SYSTEM_UNKNOWN: u32 = 11060;
    /// Quote replies and app shares, discriminated by a nested type field.
    pub const APP_MSG: u32 = 11061;
    pub const MEMBER_LEFT: u32 = 11099;
}

/// A raw event as handed over by the desktop automation client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WcfEvent {
    /// Vendor message id.
    pub id: String,
    /// Vendor message-type code (see [`codes`]).
    pub type_code: u32,
    /// Unix seconds. Not every event carries one.
    pub ts: Option<i64>,
    /// Sending peer (a contact id, or the room id for some system events).
    pub sender: String,
    /// Present exactly when the event originated in a group chat.
    pub room_id: Option<String>,
    /// Text content, or raw markup for structured kinds.
    pub content: String,
    /// Vendor-side file path for attachment kinds.
    pub extra: String,
    /// Raw XML payload for app messages and system notices.
    pub raw_xml: Option<String>,
    /// Local audio path the vendor client already transcoded.
    pub audio_path: Option<String>,
    /// Local video path delivered by the vendor client.
    pub video_path: Option<String>,
    /// Ids the vendor says were @-mentioned.
    pub at_list: Vec<String>,
}

impl WcfEvent {
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.room_id.is_some()
    }

    /// The structured payload for this event, preferring the dedicated raw
    /// field over `content`.
    #[must_use]
    pub fn xml(&self) -> &str {
        self.raw_xml.as_deref().unwrap_or(&self.content)
    }
}
