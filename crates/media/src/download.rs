use std::{
    io::Write,
    path::{Path, PathBuf},
};

use {
    futures::StreamExt,
    sha2::{Digest, Sha256},
    tracing::{debug, warn},
};

use crate::{Error, Result, image_ops};

/// JPEG re-encode quality for downloaded images.
const IMAGE_QUALITY: u8 = 80;

/// Download a remote file into `dir`, named by the SHA-256 of its bytes.
///
/// The body is streamed and aborted as soon as it crosses `max_bytes`, so an
/// oversized file costs at most `max_bytes` of bandwidth. When a file with
/// the same content hash already exists it is reused as-is.
pub async fn download_media(
    url: &str,
    dir: &Path,
    ext: &str,
    max_bytes: u64,
) -> Result<PathBuf> {
    let bytes = fetch_bytes_capped(url, max_bytes).await?;
    let path = content_path(dir, &bytes, ext);
    if path.exists() {
        debug!(path = %path.display(), "media already cached");
        return Ok(path);
    }
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, &bytes)?;
    debug!(url, path = %path.display(), size = bytes.len(), "media downloaded");
    Ok(path)
}

/// Download an image and re-encode it as JPEG to keep the payload small.
///
/// Bytes the `image` crate cannot decode (stickers, exotic formats) are
/// written through unchanged.
pub async fn download_image(url: &str, dir: &Path, max_bytes: u64) -> Result<PathBuf> {
    let bytes = fetch_bytes_capped(url, max_bytes).await?;
    let path = content_path(dir, &bytes, "jpg");
    if path.exists() {
        debug!(path = %path.display(), "image already cached");
        return Ok(path);
    }

    let output = match image_ops::compress_jpeg(&bytes, IMAGE_QUALITY) {
        Ok(compressed) => compressed,
        Err(e) => {
            warn!(url, error = %e, "image re-encode failed, keeping original bytes");
            bytes
        }
    };
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, &output)?;
    debug!(url, path = %path.display(), size = output.len(), "image downloaded");
    Ok(path)
}

/// Fetch a URL into memory, enforcing the byte ceiling while streaming.
async fn fetch_bytes_capped(url: &str, max_bytes: u64) -> Result<Vec<u8>> {
    let response = reqwest::get(url).await?.error_for_status()?;

    // Reject up front when the server already announces an oversized body.
    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(Error::TooLarge {
                size: len,
                limit: max_bytes,
            });
        }
    }

    let mut bytes: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
            return Err(Error::TooLarge {
                size: bytes.len() as u64 + chunk.len() as u64,
                limit: max_bytes,
            });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn content_path(dir: &Path, bytes: &[u8], ext: &str) -> PathBuf {
    let digest = Sha256::digest(bytes);
    let mut name = String::with_capacity(digest.len() * 2 + ext.len() + 1);
    for byte in digest {
        name.push_str(&format!("{byte:02x}"));
    }
    name.push('.');
    name.push_str(ext);
    dir.join(name)
}

/// A temporary media file removed when the guard drops.
///
/// Some vendor clients hold the file handle briefly after the send call
/// returns; a failed unlink is therefore a warning, not an error.
#[derive(Debug)]
pub struct TempMedia {
    path: PathBuf,
}

impl TempMedia {
    /// Write `bytes` to a fresh temp file with the given suffix.
    pub fn write(bytes: &[u8], suffix: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
        file.write_all(bytes)?;
        let (_handle, path) = file.keep().map_err(|e| Error::Io(e.error))?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "could not remove temp media, file may still be in use"
                );
            }
        }
    }
}
