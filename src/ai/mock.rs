use super::{GeneratedImage, ImageModel, ModelRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tiny valid 1x1 PNG returned when no scripted response is configured.
pub const DEFAULT_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
    0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2, 0x25,
    0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Factory for a scripted failure; errors are not `Clone`.
type FailureFn = Arc<dyn Fn() -> Error + Send + Sync>;

/// Scripted stand-in for the remote model.
///
/// Clones share state, so a probe clone can observe calls made through a
/// boxed copy handed to the code under test.
#[derive(Clone)]
pub struct MockImageModel {
    responses: Arc<Mutex<Vec<Vec<u8>>>>,
    failures: Arc<Mutex<Vec<(usize, FailureFn)>>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
    call_count: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockImageModel {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    /// Responses are handed out in call order, cycling when exhausted.
    pub fn with_image_response(self, bytes: Vec<u8>) -> Self {
        self.responses.lock().unwrap().push(bytes);
        self
    }

    /// Make the call with this zero-based index fail.
    pub fn with_failure_on_call<F>(self, call_index: usize, failure: F) -> Self
    where
        F: Fn() -> Error + Send + Sync + 'static,
    {
        self.failures
            .lock()
            .unwrap()
            .push((call_index, Arc::new(failure)));
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockImageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageModel for MockImageModel {
    async fn generate(&self, request: &ModelRequest) -> Result<GeneratedImage> {
        let index = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count - 1
        };
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(at, _)| *at == index)
            .map(|(_, make)| make.clone());
        if let Some(make) = failure {
            return Err(make());
        }

        let bytes = {
            let responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                DEFAULT_PNG.to_vec()
            } else {
                responses[index % responses.len()].clone()
            }
        };

        use base64::Engine as _;
        Ok(GeneratedImage {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: "image/png".to_string(),
        })
    }
}
