use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;

use {
    wegate_channels::Result,
    wegate_directory::{Group, Identity},
};

use crate::{
    client::{RichLink, SelfInfo, WcfClient},
    event::WcfEvent,
};

/// Everything the mock recorded being sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { receiver: String, text: String },
    MentionText {
        receiver: String,
        text: String,
        mention_ids: Vec<String>,
    },
    Image { receiver: String, path: PathBuf },
    File { receiver: String, path: PathBuf },
    Gif { receiver: String, path: PathBuf },
    Card { receiver: String, xml: String },
    RichLink { receiver: String, title: String },
    Xml { receiver: String, xml: String },
    CallUp { receiver: String },
    Invite {
        room_id: String,
        member_ids: Vec<String>,
    },
}

/// In-memory `WcfClient` for unit tests: canned directory data, recorded
/// sends, no I/O.
#[derive(Default)]
pub struct MockClient {
    pub contacts: Vec<Identity>,
    pub groups: Vec<Group>,
    pub sent: Mutex<Vec<Sent>>,
    pub decrypted_image: Option<PathBuf>,
    /// Events replayed by `next_event`; `None` once drained.
    pub events: Mutex<VecDeque<WcfEvent>>,
}

impl MockClient {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn with_events(events: Vec<WcfEvent>) -> Self {
        Self {
            events: Mutex::new(events.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl WcfClient for MockClient {
    async fn get_self_info(&self) -> Result<SelfInfo> {
        Ok(SelfInfo {
            id: "bot-id".into(),
            name: "bot".into(),
        })
    }

    async fn get_contacts(&self) -> Result<Vec<Identity>> {
        Ok(self.contacts.clone())
    }

    async fn get_groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups.clone())
    }

    async fn query_display_name(&self, id: &str) -> Result<Option<String>> {
        Ok(self
            .contacts
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone()))
    }

    async fn download_attachment(&self, _message_id: &str, _extra: &str) -> Result<()> {
        Ok(())
    }

    async fn decrypt_image(&self, _extra: &str, _dest_dir: &Path) -> Result<Option<PathBuf>> {
        Ok(self.decrypted_image.clone())
    }

    async fn accept_friend_request(
        &self,
        _encrypt_username: &str,
        _ticket: &str,
        _scene: i32,
    ) -> Result<()> {
        Ok(())
    }

    async fn send_text(&self, receiver: &str, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Text {
            receiver: receiver.into(),
            text: text.into(),
        });
        Ok(())
    }

    async fn send_mention_text(
        &self,
        receiver: &str,
        text: &str,
        mention_ids: &[String],
    ) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::MentionText {
            receiver: receiver.into(),
            text: text.into(),
            mention_ids: mention_ids.to_vec(),
        });
        Ok(())
    }

    async fn send_image(&self, receiver: &str, path: &Path) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Image {
            receiver: receiver.into(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn send_file(&self, receiver: &str, path: &Path) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::File {
            receiver: receiver.into(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn send_gif(&self, receiver: &str, path: &Path) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Gif {
            receiver: receiver.into(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn send_card(&self, receiver: &str, card_xml: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Card {
            receiver: receiver.into(),
            xml: card_xml.into(),
        });
        Ok(())
    }

    async fn send_rich_link(&self, receiver: &str, link: &RichLink) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::RichLink {
            receiver: receiver.into(),
            title: link.title.clone(),
        });
        Ok(())
    }

    async fn send_xml(&self, receiver: &str, xml: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Xml {
            receiver: receiver.into(),
            xml: xml.into(),
        });
        Ok(())
    }

    async fn send_call_up(&self, receiver: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::CallUp {
            receiver: receiver.into(),
        });
        Ok(())
    }

    async fn invite_room_members(&self, room_id: &str, member_ids: &[String]) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Invite {
            room_id: room_id.into(),
            member_ids: member_ids.to_vec(),
        });
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<WcfEvent>> {
        Ok(self.events.lock().unwrap().pop_front())
    }
}
