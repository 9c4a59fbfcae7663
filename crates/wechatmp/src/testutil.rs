use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;

use wegate_channels::Result;

use crate::client::MpClient;

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { receiver: String, text: String },
    Image { receiver: String, path: PathBuf },
    Voice { receiver: String, path: PathBuf },
}

/// In-memory `MpClient` for unit tests.
#[derive(Default)]
pub struct MockClient {
    pub sent: Mutex<Vec<Sent>>,
}

impl MockClient {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MpClient for MockClient {
    async fn download_media(
        &self,
        media_id: &str,
        format: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        Ok(dest_dir.join(format!("{media_id}.{}", format.unwrap_or("bin"))))
    }

    async fn send_text(&self, user_id: &str, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Text {
            receiver: user_id.into(),
            text: text.into(),
        });
        Ok(())
    }

    async fn send_image(&self, user_id: &str, path: &Path) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Image {
            receiver: user_id.into(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn send_voice(&self, user_id: &str, path: &Path) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Voice {
            receiver: user_id.into(),
            path: path.to_path_buf(),
        });
        Ok(())
    }
}
