use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;

use {
    wegate_channels::Result,
    wegate_directory::{Group, GroupMember, Identity},
};

use crate::{
    client::{LoginInfo, WeworkClient},
    event::{CdnRef, WeworkEvent},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { receiver: String, text: String },
    RoomAt {
        receiver: String,
        text: String,
        mention_ids: Vec<String>,
    },
    Image { receiver: String, path: PathBuf },
    Video { receiver: String, path: PathBuf },
    File { receiver: String, path: PathBuf },
}

/// In-memory `WeworkClient` for unit tests.
#[derive(Default)]
pub struct MockClient {
    pub contacts: Vec<Identity>,
    pub rooms: Vec<Group>,
    pub rosters: HashMap<String, HashMap<String, GroupMember>>,
    pub sent: Mutex<Vec<Sent>>,
    pub events: Mutex<VecDeque<WeworkEvent>>,
    pub downloaded_path: Option<PathBuf>,
}

impl MockClient {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn with_events(events: Vec<WeworkEvent>) -> Self {
        Self {
            events: Mutex::new(events.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl WeworkClient for MockClient {
    async fn get_login_info(&self) -> Result<LoginInfo> {
        Ok(LoginInfo {
            user_id: "bot-id".into(),
            nickname: "bot".into(),
            username: "bot@corp".into(),
        })
    }

    async fn get_external_contacts(&self) -> Result<Vec<Identity>> {
        Ok(self.contacts.clone())
    }

    async fn get_rooms(&self) -> Result<Vec<Group>> {
        Ok(self.rooms.clone())
    }

    async fn get_room_members(&self, room_id: &str) -> Result<HashMap<String, GroupMember>> {
        Ok(self.rosters.get(room_id).cloned().unwrap_or_default())
    }

    async fn get_contact_detail(&self, id: &str) -> Result<Option<Identity>> {
        Ok(self.contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn download_media(&self, _cdn: &CdnRef, _dest_dir: &Path) -> Result<PathBuf> {
        Ok(self
            .downloaded_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("/tmp/media.bin")))
    }

    async fn download_voice(&self, _cdn: &CdnRef, _dest_dir: &Path) -> Result<PathBuf> {
        Ok(self
            .downloaded_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("/tmp/voice.wav")))
    }

    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Text {
            receiver: conversation_id.into(),
            text: text.into(),
        });
        Ok(())
    }

    async fn send_room_at_msg(
        &self,
        conversation_id: &str,
        text: &str,
        mention_ids: &[String],
    ) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::RoomAt {
            receiver: conversation_id.into(),
            text: text.into(),
            mention_ids: mention_ids.to_vec(),
        });
        Ok(())
    }

    async fn send_image(&self, conversation_id: &str, path: &Path) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Image {
            receiver: conversation_id.into(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn send_video(&self, conversation_id: &str, path: &Path) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Video {
            receiver: conversation_id.into(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn send_file(&self, conversation_id: &str, path: &Path) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::File {
            receiver: conversation_id.into(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<WeworkEvent>> {
        Ok(self.events.lock().unwrap().pop_front())
    }
}
