//! Application wiring: remote model, orchestrator, session and result export.

use crate::ai::{GeminiImageClient, ImageModel};
use crate::image::{self, ImageAsset};
use crate::messages::Locale;
use crate::models::{Config, OperationRequest};
use crate::orchestrator::Orchestrator;
use crate::session::{GenerationResult, SessionController, SessionSnapshot};
use crate::{Error, Result};
use base64::Engine as _;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Drives one interactive session against an image model.
pub struct App {
    orchestrator: Arc<Orchestrator>,
    session: SessionController,
    output_dir: PathBuf,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub model: Arc<dyn ImageModel>,
}

impl App {
    /// Build an app from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: AppServices, output_dir: PathBuf, locale: Locale) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(services.model));
        Self {
            session: SessionController::new(Arc::clone(&orchestrator), locale),
            orchestrator,
            output_dir,
        }
    }

    /// Construct an app talking to Gemini with the given credential.
    pub fn from_config(config: &Config, api_key: String) -> Result<Self> {
        let http_client = reqwest::Client::builder().build()?;

        info!(
            "Image provider: Gemini (model: {}, base url: {})",
            config.model, config.base_url
        );
        let model = GeminiImageClient::new_with_client(
            api_key,
            config.model.clone(),
            config.request_timeout,
            http_client,
        )
        .with_base_url(config.base_url.clone());

        Ok(Self::with_services(
            AppServices {
                model: Arc::new(model),
            },
            config.output_dir.clone(),
            config.locale,
        ))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub async fn submit(&mut self, request: OperationRequest) -> SessionSnapshot {
        self.session.submit(request).await
    }

    /// Surface a local input error, e.g. a form that failed to build a request.
    pub fn reject(&mut self, error: &Error) -> SessionSnapshot {
        self.session.reject(error)
    }

    pub async fn remove_background(&self, asset: &ImageAsset) -> Result<ImageAsset> {
        image::remove_background(self.orchestrator.model(), asset).await
    }

    pub async fn isolate_clothing(&self, asset: &ImageAsset) -> Result<ImageAsset> {
        image::isolate_clothing(self.orchestrator.model(), asset).await
    }

    /// Write every result image to the output directory.
    ///
    /// Files are named `banana-ai-<index>-<millis>.<ext>` with the extension
    /// taken from the data URI type.
    pub fn save_results(&self, result: &GenerationResult) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;
        let millis = Utc::now().timestamp_millis();

        let mut paths = Vec::with_capacity(result.images.len());
        for (index, image) in result.images.iter().enumerate() {
            let extension = match image.mime_type() {
                "image/png" => "png",
                "image/webp" => "webp",
                _ => "jpg",
            };
            let payload = image
                .data_uri
                .split_once(";base64,")
                .map(|(_, data)| data)
                .ok_or_else(|| Error::Invariant("result is not a base64 data URI".to_string()))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(payload)
                .map_err(|e| Error::Invariant(format!("result payload is not base64: {}", e)))?;

            let path = self
                .output_dir
                .join(format!("banana-ai-{}-{}.{}", index, millis, extension));
            fs::write(&path, bytes)?;
            info!("Saved {}", path.display());
            paths.push(path);
        }
        Ok(paths)
    }

    /// Write a transformed asset under its own filename.
    pub fn save_asset(&self, asset: &ImageAsset) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(asset.filename());
        fs::write(&path, asset.bytes())?;
        info!("Saved {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockImageModel;
    use crate::models::{CreateRequest, UpscaleRequest};
    use crate::session::SessionState;
    use tempfile::TempDir;

    fn app(model: &MockImageModel, dir: &TempDir) -> App {
        App::with_services(
            AppServices {
                model: Arc::new(model.clone()),
            },
            dir.path().join("out"),
            Locale::En,
        )
    }

    #[tokio::test]
    async fn test_save_results_names_files_by_index() {
        let dir = TempDir::new().unwrap();
        let model = MockImageModel::new().with_image_response(vec![1, 2, 3]);
        let mut app = app(&model, &dir);

        let snapshot = app
            .submit(OperationRequest::Create(CreateRequest::new("a fox")))
            .await;
        let SessionState::Succeeded(result) = snapshot.state else {
            panic!("expected success");
        };

        let paths = app.save_results(&result).unwrap();
        assert_eq!(paths.len(), 4);
        for (index, path) in paths.iter().enumerate() {
            let name = path.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with(&format!("banana-ai-{}-", index)));
            assert!(name.ends_with(".jpg"));
            assert_eq!(fs::read(path).unwrap(), vec![1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn test_single_result_saved_as_png() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&MockImageModel::new(), &dir);

        let snapshot = app
            .submit(OperationRequest::Upscale(UpscaleRequest::new(ImageAsset::new(
                vec![1],
                "image/png",
                "old.png",
            ))))
            .await;
        let SessionState::Succeeded(result) = snapshot.state else {
            panic!("expected success");
        };

        let paths = app.save_results(&result).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].extension().unwrap(), "png");
    }

    #[tokio::test]
    async fn test_remove_background_and_save_asset() {
        let dir = TempDir::new().unwrap();
        let model = MockImageModel::new().with_image_response(vec![4, 4]);
        let app = app(&model, &dir);

        let source = ImageAsset::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg", "look.jpg");
        let cut = app.remove_background(&source).await.unwrap();
        let path = app.save_asset(&cut).unwrap();

        assert_eq!(path, dir.path().join("out").join("nobg-look.png"));
        assert_eq!(fs::read(path).unwrap(), vec![4, 4]);
        assert_eq!(model.get_call_count(), 1);
    }
}
