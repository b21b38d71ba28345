//! Remote image model integration
//!
//! Every operation, including asset transformations, goes through the single
//! [`ImageModel::generate`] contract: ordered attachments plus a prompt in,
//! one inline image out.

pub mod classify;
pub mod gemini;
pub mod mock;

pub use gemini::GeminiImageClient;
pub use mock::MockImageModel;

use crate::image::EncodedImage;
use crate::models::AspectRatio;
use crate::Result;
use async_trait::async_trait;

/// One ordered element of a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Image(EncodedImage),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub attachments: Vec<Attachment>,
    pub aspect_ratio: Option<AspectRatio>,
}

impl ModelRequest {
    /// Images first, in the given order, followed by the prompt text.
    pub fn new(images: Vec<EncodedImage>, prompt: impl Into<String>) -> Self {
        let mut attachments: Vec<Attachment> = images.into_iter().map(Attachment::Image).collect();
        attachments.push(Attachment::Text(prompt.into()));
        Self {
            attachments,
            aspect_ratio: None,
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: Option<AspectRatio>) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn images(&self) -> impl Iterator<Item = &EncodedImage> {
        self.attachments.iter().filter_map(|a| match a {
            Attachment::Image(image) => Some(image),
            Attachment::Text(_) => None,
        })
    }

    /// The trailing prompt text, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.attachments.iter().rev().find_map(|a| match a {
            Attachment::Text(text) => Some(text.as_str()),
            Attachment::Image(_) => None,
        })
    }
}

/// Base64 image payload returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data: String,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn decode(&self) -> Result<Vec<u8>> {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| crate::Error::AiProvider(format!("Failed to decode base64 image: {}", e)))
    }
}

#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<GeneratedImage>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::SupportedMime;

    #[test]
    fn test_model_request_puts_prompt_last() {
        let request = ModelRequest::new(
            vec![
                EncodedImage::from_bytes(&[1], SupportedMime::Png),
                EncodedImage::from_bytes(&[2], SupportedMime::Jpeg),
            ],
            "make it pop",
        );

        assert_eq!(request.attachments.len(), 3);
        assert!(matches!(request.attachments[2], Attachment::Text(ref t) if t == "make it pop"));
        assert_eq!(request.images().count(), 2);
        assert_eq!(request.prompt(), Some("make it pop"));
        assert_eq!(request.aspect_ratio, None);
    }

    #[test]
    fn test_generated_image_decode_rejects_garbage() {
        let image = GeneratedImage {
            data: "!!!".to_string(),
            mime_type: "image/png".to_string(),
        };
        assert!(image.decode().is_err());
    }
}
