use image::codecs::jpeg::JpegEncoder;

use crate::{Error, Result};

/// Re-encode arbitrary image bytes as JPEG at the given quality.
pub fn compress_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::failed(format!("decode image: {e}")))?;
    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| Error::failed(format!("encode jpeg: {e}")))?;
    Ok(out)
}
