use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Gateway configuration.
///
/// Every field has a default so a partial (or absent) config file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Which channel adapter to start: "wcferry", "wework" or "wechatmp".
    pub channel_type: String,

    /// Forward voice messages to the responder. When off, voice messages
    /// are dropped at the routing stage.
    pub speech_recognition: bool,

    /// Auto-accept inbound friend requests (after a randomized delay).
    pub accept_friend: bool,

    /// Daily restart mark in `HH:MM` local time. `None` disables the check.
    pub restart_time: Option<String>,

    /// Verbose diagnostic logging.
    pub debug: bool,

    /// Directory for cached directory snapshots and downloaded media.
    pub data_dir: PathBuf,

    /// Display name announced by channels that cannot query their own
    /// profile (the official-account webhook).
    pub bot_name: Option<String>,

    /// Hard ceiling for any single media download, in bytes.
    pub media_max_bytes: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            channel_type: "wcferry".into(),
            speech_recognition: false,
            accept_friend: false,
            restart_time: None,
            debug: false,
            data_dir: PathBuf::from("data"),
            bot_name: None,
            // 30 MB, matching the video cutoff the desktop client tolerates.
            media_max_bytes: 30 * 1024 * 1024,
        }
    }
}

impl GateConfig {
    /// Parse `restart_time` into `(hour, minute)`. Returns `None` when unset
    /// or malformed; the caller logs malformed values once and moves on.
    #[must_use]
    pub fn restart_mark(&self) -> Option<(u32, u32)> {
        let raw = self.restart_time.as_deref()?;
        let (h, m) = raw.split_once(':')?;
        let hour: u32 = h.parse().ok()?;
        let minute: u32 = m.parse().ok()?;
        if hour < 24 && minute < 60 {
            Some((hour, minute))
        } else {
            None
        }
    }
}
