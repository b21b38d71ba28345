use super::{mime, EncodedImage, ImageAsset, SupportedMime};
use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;

/// JPEG quality used when transcoding unsupported formats.
pub const JPEG_QUALITY: u8 = 95;

/// Recognised formats that no bundled decoder can read.
const UNDECODABLE_MIME: &[&str] = &["image/heic", "image/heif"];

/// Convert an asset into the canonical encoded form.
///
/// JPEG, PNG and WEBP bytes pass through untouched. Anything else is decoded
/// and re-encoded as JPEG. HEIC/HEIF fails with [`Error::UnsupportedFormat`];
/// other undecodable input fails with [`Error::Decode`].
pub fn normalize(asset: &ImageAsset) -> Result<EncodedImage> {
    if let Some(mime_type) = SupportedMime::from_mime(asset.mime_type()) {
        return Ok(EncodedImage::from_bytes(asset.bytes(), mime_type));
    }

    if let Some(mime_type) = undecodable_format(asset) {
        tracing::warn!("{} is {}, which cannot be converted", asset.filename(), mime_type);
        return Err(Error::UnsupportedFormat {
            filename: asset.filename().to_string(),
            mime_type,
        });
    }

    tracing::debug!(
        "Transcoding {} from {} to JPEG",
        asset.filename(),
        asset.mime_type()
    );
    let jpeg = transcode_to_jpeg(asset)?;
    Ok(EncodedImage::from_bytes(&jpeg, SupportedMime::Jpeg))
}

fn transcode_to_jpeg(asset: &ImageAsset) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(asset.bytes()).map_err(|e| Error::Decode {
        filename: asset.filename().to_string(),
        detail: e.to_string(),
    })?;

    // JPEG has no alpha channel
    let rgb = decoded.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out)
}

/// Declared or sniffed type, when it is one we know we cannot decode.
fn undecodable_format(asset: &ImageAsset) -> Option<String> {
    let declared = asset.mime_type().trim().to_ascii_lowercase();
    let sniffed = mime::detect_image_mime(asset.bytes());

    if UNDECODABLE_MIME.contains(&declared.as_str()) {
        return Some(declared);
    }
    if let Some(sniffed) = sniffed.filter(|m| UNDECODABLE_MIME.contains(m)) {
        return Some(sniffed.to_string());
    }
    let avif = declared == "image/avif" || sniffed == Some("image/avif");
    if avif && !cfg!(feature = "avif-decode") {
        return Some("image/avif".to_string());
    }
    None
}

/// Normalize several assets off the async runtime, preserving input order.
pub async fn normalize_all(assets: &[&ImageAsset]) -> Result<Vec<EncodedImage>> {
    let jobs = assets.iter().map(|asset| {
        let asset = (*asset).clone();
        tokio::task::spawn_blocking(move || normalize(&asset))
    });

    futures::future::join_all(jobs)
        .await
        .into_iter()
        .map(|joined| {
            joined.map_err(|e| Error::Invariant(format!("Image normalize task join error: {}", e)))?
        })
        .collect()
}
