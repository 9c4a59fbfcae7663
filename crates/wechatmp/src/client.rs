use std::path::{Path, PathBuf};

use async_trait::async_trait;

use wegate_channels::Result;

/// Official-account API surface: media download plus customer-service
/// sends. Token management and HTTP live in the implementation.
#[async_trait]
pub trait MpClient: Send + Sync {
    /// Download a media payload by id into `dest_dir` and return its path.
    async fn download_media(
        &self,
        media_id: &str,
        format: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf>;

    async fn send_text(&self, user_id: &str, text: &str) -> Result<()>;

    async fn send_image(&self, user_id: &str, path: &Path) -> Result<()>;

    async fn send_voice(&self, user_id: &str, path: &Path) -> Result<()>;
}
