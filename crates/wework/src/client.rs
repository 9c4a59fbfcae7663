use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use {
    wegate_channels::Result,
    wegate_directory::{Group, GroupMember, Identity},
};

use crate::event::{CdnRef, WeworkEvent};

/// The logged-in enterprise account.
#[derive(Debug, Clone, Default)]
pub struct LoginInfo {
    pub user_id: String,
    pub nickname: String,
    pub username: String,
}

impl LoginInfo {
    /// Preferred display name: nickname, falling back to the login name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.username
        } else {
            &self.nickname
        }
    }
}

/// Re-exported so implementors only need this module.
pub type CdnInfo = CdnRef;

/// Enterprise WeChat client surface.
///
/// `get_login_info` blocks until the desktop client finishes its login
/// handshake.
#[async_trait]
pub trait WeworkClient: Send + Sync {
    async fn get_login_info(&self) -> Result<LoginInfo>;

    async fn get_external_contacts(&self) -> Result<Vec<Identity>>;

    /// Room list without member rosters.
    async fn get_rooms(&self) -> Result<Vec<Group>>;

    /// Member roster for one room.
    async fn get_room_members(&self, room_id: &str) -> Result<HashMap<String, GroupMember>>;

    /// Detailed profile for one contact, if the vendor knows it.
    async fn get_contact_detail(&self, id: &str) -> Result<Option<Identity>>;

    /// Pull and decrypt a CDN media payload to `dest_dir`.
    async fn download_media(&self, cdn: &CdnRef, dest_dir: &Path) -> Result<PathBuf>;

    /// Pull a voice payload and transcode it to something playable (the
    /// raw codec is useless downstream).
    async fn download_voice(&self, cdn: &CdnRef, dest_dir: &Path) -> Result<PathBuf>;

    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()>;

    /// Text send @-mentioning the given member ids.
    async fn send_room_at_msg(
        &self,
        conversation_id: &str,
        text: &str,
        mention_ids: &[String],
    ) -> Result<()>;

    async fn send_image(&self, conversation_id: &str, path: &Path) -> Result<()>;

    async fn send_video(&self, conversation_id: &str, path: &Path) -> Result<()>;

    async fn send_file(&self, conversation_id: &str, path: &Path) -> Result<()>;

    /// Next event from the receive queue; `None` when the stream closes.
    async fn next_event(&self) -> Result<Option<WeworkEvent>>;
}
