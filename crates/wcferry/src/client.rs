use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use {
    wegate_channels::Result,
    wegate_directory::{Group, Identity},
};

use crate::event::WcfEvent;

/// The logged-in account.
#[derive(Debug, Clone, Default)]
pub struct SelfInfo {
    pub id: String,
    pub name: String,
}

/// Rich-link payload for `send_rich_link`, decoded from a responder's JSON
/// reply content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichLink {
    pub name: String,
    pub account: String,
    pub title: String,
    pub digest: String,
    pub url: String,
}

/// Desktop WeChat automation RPC surface.
///
/// Implemented out of tree by the actual bindings; everything here blocks
/// on IPC with the running WeChat client. `get_self_info` does not return
/// until the user has completed the login handshake.
#[async_trait]
pub trait WcfClient: Send + Sync {
    async fn get_self_info(&self) -> Result<SelfInfo>;

    /// Full contact snapshot: friends, official accounts and rooms.
    async fn get_contacts(&self) -> Result<Vec<Identity>>;

    /// Room snapshot with member rosters.
    async fn get_groups(&self) -> Result<Vec<Group>>;

    /// Point lookup against the client's local contact database.
    async fn query_display_name(&self, id: &str) -> Result<Option<String>>;

    /// Ask the client to pull an attachment to its local store.
    async fn download_attachment(&self, message_id: &str, extra: &str) -> Result<()>;

    /// Decrypt a downloaded image into `dest_dir`. `None` means the
    /// attachment is not on disk yet and the caller should re-poll.
    async fn decrypt_image(&self, extra: &str, dest_dir: &Path) -> Result<Option<PathBuf>>;

    async fn accept_friend_request(
        &self,
        encrypt_username: &str,
        ticket: &str,
        scene: i32,
    ) -> Result<()>;

    async fn send_text(&self, receiver: &str, text: &str) -> Result<()>;

    /// Text send with an @-mention list.
    async fn send_mention_text(
        &self,
        receiver: &str,
        text: &str,
        mention_ids: &[String],
    ) -> Result<()>;

    async fn send_image(&self, receiver: &str, path: &Path) -> Result<()>;

    async fn send_file(&self, receiver: &str, path: &Path) -> Result<()>;

    async fn send_gif(&self, receiver: &str, path: &Path) -> Result<()>;

    async fn send_card(&self, receiver: &str, card_xml: &str) -> Result<()>;

    async fn send_rich_link(&self, receiver: &str, link: &RichLink) -> Result<()>;

    async fn send_xml(&self, receiver: &str, xml: &str) -> Result<()>;

    /// Nudge the peer with a voice-call prompt.
    async fn send_call_up(&self, receiver: &str) -> Result<()>;

    async fn invite_room_members(&self, room_id: &str, member_ids: &[String]) -> Result<()>;

    /// Next event from the client's receive queue. `None` means the client
    /// shut the stream down.
    async fn next_event(&self) -> Result<Option<WcfEvent>>;
}
