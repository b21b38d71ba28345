//! Asset transformations built on the same remote call as the main operations.
//!
//! Each transformation takes an asset and returns a brand new PNG asset that
//! supersedes it; the input is left untouched.

use super::{normalize, ImageAsset};
use crate::ai::{ImageModel, ModelRequest};
use crate::Result;

pub const REMOVE_BACKGROUND_PROMPT: &str = "Remove the background from this image. Keep the main subject on a transparent background. High quality.";

pub const ISOLATE_CLOTHING_PROMPT: &str = "Create a flat lay product photography of the outfit in this image. Isolate the clothing on a pure white background. Do not show any person or body parts. Focus only on the textile and design.";

/// Cut the main subject out onto a transparent background.
pub async fn remove_background(model: &dyn ImageModel, asset: &ImageAsset) -> Result<ImageAsset> {
    transform(model, asset, REMOVE_BACKGROUND_PROMPT, "nobg").await
}

/// Produce a flat-lay product shot of the outfit worn in the image.
pub async fn isolate_clothing(model: &dyn ImageModel, asset: &ImageAsset) -> Result<ImageAsset> {
    transform(model, asset, ISOLATE_CLOTHING_PROMPT, "separated").await
}

async fn transform(
    model: &dyn ImageModel,
    asset: &ImageAsset,
    instruction: &str,
    prefix: &str,
) -> Result<ImageAsset> {
    tracing::info!("Running '{}' transformation on {}", prefix, asset.filename());

    let encoded = normalize(asset)?;
    let generated = model
        .generate(&ModelRequest::new(vec![encoded], instruction))
        .await?;

    Ok(ImageAsset::new(
        generated.decode()?,
        "image/png",
        format!("{}-{}.png", prefix, asset.stem()),
    ))
}
