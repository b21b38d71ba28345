//! Image assets and their canonical encoded form
//!
//! User uploads (or results of a remote transformation) are held as
//! immutable [`ImageAsset`]s and normalized into [`EncodedImage`]s before
//! being attached to a model request.

pub mod mime;
pub mod normalizer;
pub mod transform;

pub use normalizer::{normalize, normalize_all};
pub use transform::{isolate_clothing, remove_background};

use crate::Result;
use base64::Engine as _;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// MIME types the remote model accepts as inline image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedMime {
    Jpeg,
    Png,
    Webp,
}

impl SupportedMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedMime::Jpeg => "image/jpeg",
            SupportedMime::Png => "image/png",
            SupportedMime::Webp => "image/webp",
        }
    }

    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" => Some(SupportedMime::Jpeg),
            "image/png" => Some(SupportedMime::Png),
            "image/webp" => Some(SupportedMime::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for SupportedMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw image bytes with their declared type and origin filename.
///
/// Assets are never mutated; a transformation produces a new asset that
/// supersedes the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    bytes: Arc<[u8]>,
    mime_type: String,
    filename: String,
}

impl ImageAsset {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }

    /// Load a file, declaring its type from the extension and falling back to content sniffing.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime_type = mime_guess::from_path(path)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map(|m| m.essence_str().to_string())
            .or_else(|| mime::detect_image_mime(&bytes).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        tracing::debug!(
            "Loaded {} ({} bytes, declared {})",
            filename,
            bytes.len(),
            mime_type
        );

        Ok(Self::new(bytes, mime_type, filename))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Filename without its final extension.
    pub fn stem(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.filename,
        }
    }
}

/// Canonical `{ data, mimeType }` payload attached to a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: SupportedMime,
}

impl EncodedImage {
    pub fn from_bytes(bytes: &[u8], mime_type: SupportedMime) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type,
        }
    }
}
