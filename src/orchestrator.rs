//! Fan-out of one operation into concurrent remote calls.
//!
//! Multi-variant modes issue four calls at once and join them collectively:
//! every call settles before the batch resolves, and a single failure voids
//! the whole batch. Siblings of a failed call are never cancelled.

use crate::ai::{GeneratedImage, ImageModel, ModelRequest};
use crate::image::{normalize_all, EncodedImage, ImageAsset};
use crate::models::{AspectRatio, Mode, OperationRequest};
use crate::prompts;
use crate::Result;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Attachments in the order they are sent, ahead of the prompt text.
pub fn ordered_assets(request: &OperationRequest) -> Vec<&ImageAsset> {
    match request {
        OperationRequest::Generate(req) => req
            .source_images
            .iter()
            .chain(req.outfit.as_ref())
            .chain(req.accessory.as_ref())
            .collect(),
        OperationRequest::Create(req) => req
            .reference_images
            .iter()
            .chain(req.outfit.as_ref())
            .collect(),
        OperationRequest::Edit(req) => [&req.model_image, &req.product_image]
            .into_iter()
            .chain(req.accessory_images())
            .collect(),
        OperationRequest::Upscale(req) => std::iter::once(&req.original)
            .chain(req.face_reference.as_ref())
            .collect(),
    }
}

/// Everything needed to issue the remote calls for one submission.
#[derive(Debug, Clone)]
pub struct PreparedOperation {
    pub mode: Mode,
    pub images: Vec<EncodedImage>,
    pub prompts: Vec<String>,
    pub aspect_ratio: Option<AspectRatio>,
}

pub struct Orchestrator {
    model: Arc<dyn ImageModel>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ImageModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &dyn ImageModel {
        self.model.as_ref()
    }

    /// Validate, normalize attachments and render prompts. No remote calls.
    pub async fn prepare(&self, request: &OperationRequest) -> Result<PreparedOperation> {
        request.validate()?;

        let images = normalize_all(&ordered_assets(request)).await?;
        let prompts = prompts::build_prompts(request);
        debug!(
            "Prepared {} request: {} attachment(s), {} prompt(s)",
            request.mode(),
            images.len(),
            prompts.len()
        );

        Ok(PreparedOperation {
            mode: request.mode(),
            images,
            prompts,
            aspect_ratio: request.aspect_ratio(),
        })
    }

    /// Issue one call per prompt and join them all.
    ///
    /// Results come back in prompt order. The first failure in that order is
    /// reported once every call has settled.
    pub async fn execute(&self, prepared: &PreparedOperation) -> Result<Vec<GeneratedImage>> {
        info!(
            "Dispatching {} remote call(s) for {}",
            prepared.prompts.len(),
            prepared.mode
        );

        let calls = prepared.prompts.iter().enumerate().map(|(index, prompt)| {
            let request = ModelRequest::new(prepared.images.clone(), prompt.as_str())
                .with_aspect_ratio(prepared.aspect_ratio);
            let model = Arc::clone(&self.model);
            async move {
                let outcome = model.generate(&request).await;
                if let Err(e) = &outcome {
                    warn!("Remote call {} failed: {}", index, e);
                }
                outcome
            }
        });

        let settled = join_all(calls).await;
        let images = settled.into_iter().collect::<Result<Vec<_>>>()?;

        info!("All {} remote call(s) succeeded", images.len());
        Ok(images)
    }

    pub async fn run(&self, request: &OperationRequest) -> Result<Vec<GeneratedImage>> {
        let prepared = self.prepare(request).await?;
        self.execute(&prepared).await
    }
}
