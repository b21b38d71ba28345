use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig,
    InlineData, Part,
};
use crate::ai::{classify, Attachment, GeneratedImage, ImageModel, ModelRequest};
use crate::error::RefusalReason;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct GeminiImageClient {
    http: GeminiHttpClient,
}

impl GeminiImageClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, None, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Option<Duration>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, timeout, client),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(request: &ModelRequest) -> GenerateContentRequest {
        let parts = request
            .attachments
            .iter()
            .map(|attachment| match attachment {
                Attachment::Image(image) => Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.as_str().to_string(),
                        data: image.data.clone(),
                    },
                },
                Attachment::Text(text) => Part::Text { text: text.clone() },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content { role: None, parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: request.aspect_ratio.map(|ratio| ImageConfig {
                    aspect_ratio: ratio.as_str().to_string(),
                }),
            },
        }
    }
}

/// Pull the first inline image out of a response, classifying refusals.
pub(crate) fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage> {
    if let Some(block_reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        tracing::warn!("Gemini blocked the prompt: {}", block_reason);
        let reason = classify::refusal_reason(&block_reason).unwrap_or(RefusalReason::Safety);
        return Err(Error::SafetyRejected { reason });
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(Error::NoImageReturned);
    };
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut first_text = None;
    for part in parts {
        match part {
            Part::InlineData { inline_data } => {
                tracing::debug!(
                    "Gemini returned image with mime_type: {}",
                    inline_data.mime_type
                );
                let image = GeneratedImage {
                    data: inline_data.data,
                    mime_type: inline_data.mime_type,
                };
                image.decode()?;
                return Ok(image);
            }
            Part::Text { text } if first_text.is_none() && !text.trim().is_empty() => {
                first_text = Some(text);
            }
            _ => {}
        }
    }

    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .and_then(classify::refusal_reason)
    {
        tracing::warn!("Gemini stopped with refusal: {:?}", reason);
        return Err(Error::SafetyRejected { reason });
    }

    match first_text {
        Some(text) => {
            tracing::warn!("Gemini answered with text instead of an image");
            Err(Error::SafetyRejected {
                reason: RefusalReason::ModelText(text),
            })
        }
        None => Err(Error::NoImageReturned),
    }
}

#[async_trait]
impl ImageModel for GeminiImageClient {
    async fn generate(&self, request: &ModelRequest) -> Result<GeneratedImage> {
        tracing::debug!(
            "Sending generateContent to {} with {} image(s)",
            self.http.model(),
            request.images().count()
        );
        let body = Self::build_request(request);
        let response: GenerateContentResponse = self.http.generate_content(&body).await?;
        extract_image(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use crate::image::{EncodedImage, SupportedMime};
    use crate::models::AspectRatio;
    use base64::Engine as _;
    use wiremock::matchers::{body_partial_json, body_string_contains, header};
    use wiremock::{MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

    fn make_client(server: &MockServer) -> GeminiImageClient {
        GeminiImageClient::new("key".to_string(), DEFAULT_MODEL.to_string())
            .with_base_url(server.uri())
    }

    fn png_b64() -> String {
        base64::engine::general_purpose::STANDARD.encode([0x89, 0x50, 0x4E, 0x47])
    }

    #[tokio::test]
    async fn test_generate_parses_inline_data() {
        let server = MockServer::start().await;
        let b64 = png_b64();

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(header("x-goog-api-key", "key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(test_support::inline_image_body(&b64)),
            )
            .mount(&server)
            .await;

        let image = make_client(&server)
            .generate(&ModelRequest::new(vec![], "a dream"))
            .await
            .unwrap();
        assert_eq!(image.data, b64);
        assert_eq!(image.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_request_orders_parts_and_sets_aspect_ratio() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "parts": [
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AQ==" } },
                        { "text": "wear this" }
                    ]
                }],
                "generationConfig": {
                    "responseModalities": ["IMAGE"],
                    "imageConfig": { "aspectRatio": "9:16" }
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_support::inline_image_body(&png_b64())),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = ModelRequest::new(
            vec![EncodedImage::from_bytes(&[1], SupportedMime::Jpeg)],
            "wear this",
        )
        .with_aspect_ratio(Some(AspectRatio::Story));

        make_client(&server).generate(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_aspect_ratio_omits_image_config() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_support::inline_image_body(&png_b64())),
            )
            .mount(&server)
            .await;

        make_client(&server)
            .generate(&ModelRequest::new(vec![], "upscale"))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&received[0].body);
        assert!(!body.contains("imageConfig"));
    }

    #[tokio::test]
    async fn test_text_only_response_is_soft_refusal() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "I can't help with that" }] }
                }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate(&ModelRequest::new(vec![], "a dream"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SafetyRejected {
                reason: RefusalReason::ModelText(ref text)
            } if text == "I can't help with that"
        ));
    }

    #[tokio::test]
    async fn test_empty_parts_is_no_image() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [] }, "finishReason": "STOP" }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate(&ModelRequest::new(vec![], "a dream"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoImageReturned));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_safety_rejection() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" }
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate(&ModelRequest::new(vec![], "a dream"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SafetyRejected {
                reason: RefusalReason::Safety
            }
        ));
    }

    #[tokio::test]
    async fn test_recitation_finish_reason() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "finishReason": "RECITATION" }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate(&ModelRequest::new(vec![], "a dream"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SafetyRejected {
                reason: RefusalReason::Recitation
            }
        ));
    }

    #[tokio::test]
    async fn test_quota_status_is_classified() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate(&ModelRequest::new(vec![], "a dream"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QuotaOrAuth(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_ai_provider_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(body_string_contains("a dream"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate(&ModelRequest::new(vec![], "a dream"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_invalid_base64_is_rejected() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_support::inline_image_body("!!!invalid-base64!!!")),
            )
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate(&ModelRequest::new(vec![], "a dream"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
