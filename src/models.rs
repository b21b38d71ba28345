//! Data models and structures
//!
//! Defines the operation requests accepted by the studio, the fixed option
//! catalogs (aspect ratios, video styles, shot kinds) and runtime configuration.

use crate::error::ValidationIssue;
use crate::image::ImageAsset;
use crate::messages::Locale;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const GENERATE_PROMPT_MAX_LENGTH: usize = 1000;
pub const CREATE_PROMPT_MAX_LENGTH: usize = 2000;
pub const MAX_EDIT_ACCESSORIES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Generate,
    Create,
    Edit,
    Upscale,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Generate => "generate",
            Mode::Create => "create",
            Mode::Edit => "edit",
            Mode::Upscale => "upscale",
        }
    }

    /// Generate and Create fan out into one request per shot variant.
    pub fn is_multi_variant(&self) -> bool {
        matches!(self, Mode::Generate | Mode::Create)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aspect-ratio hint passed verbatim to the remote model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Portrait,
    Story,
    Landscape,
    Widescreen,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Story,
        AspectRatio::Landscape,
        AspectRatio::Widescreen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Story => "9:16",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Widescreen => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = AspectRatio::ALL.iter().map(|r| r.as_str()).collect();
                format!(
                    "Invalid aspect ratio '{}'. Expected one of: {}",
                    s,
                    known.join(", ")
                )
            })
    }
}

/// Style tag used when deriving the companion video prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoStyle {
    #[default]
    CinematicLuxury,
    FastPacedTikTok,
    MacroDetail,
    MinimalistStudio,
    NeonCyberpunk,
    NatureOrganic,
}

impl VideoStyle {
    pub const ALL: [VideoStyle; 6] = [
        VideoStyle::CinematicLuxury,
        VideoStyle::FastPacedTikTok,
        VideoStyle::MacroDetail,
        VideoStyle::MinimalistStudio,
        VideoStyle::NeonCyberpunk,
        VideoStyle::NatureOrganic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStyle::CinematicLuxury => "Cinematic Luxury",
            VideoStyle::FastPacedTikTok => "Fast Paced TikTok",
            VideoStyle::MacroDetail => "Macro Detail",
            VideoStyle::MinimalistStudio => "Minimalist Studio",
            VideoStyle::NeonCyberpunk => "Neon Cyberpunk",
            VideoStyle::NatureOrganic => "Nature Organic",
        }
    }
}

impl fmt::Display for VideoStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoStyle {
    type Err = String;

    /// Accepts either the display id ("Neon Cyberpunk") or a kebab-case slug ("neon-cyberpunk").
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', " ");
        VideoStyle::ALL
            .into_iter()
            .find(|style| style.as_str().to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown video style '{}'", s))
    }
}

/// Camera framing used to diversify the four multi-variant outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotKind {
    Wide,
    Medium,
    CloseUp,
    Artistic,
}

impl ShotKind {
    /// Display order; result index maps onto this positionally.
    pub const ORDER: [ShotKind; 4] = [
        ShotKind::Wide,
        ShotKind::Medium,
        ShotKind::CloseUp,
        ShotKind::Artistic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShotKind::Wide => "Wide",
            ShotKind::Medium => "Medium",
            ShotKind::CloseUp => "Close-up",
            ShotKind::Artistic => "Artistic",
        }
    }
}

/// A shot kind paired with the prompt text that requests it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotVariant {
    pub kind: ShotKind,
    pub suffix: &'static str,
}

/// Identity-driven portrait generation from reference faces.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub source_images: Vec<ImageAsset>,
    pub outfit: Option<ImageAsset>,
    pub accessory: Option<ImageAsset>,
    pub aspect_ratio: AspectRatio,
    pub video_style: VideoStyle,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source_images: Vec::new(),
            outfit: None,
            accessory: None,
            aspect_ratio: AspectRatio::Portrait,
            video_style: VideoStyle::default(),
        }
    }

    pub fn with_source_image(mut self, image: ImageAsset) -> Self {
        self.source_images.push(image);
        self
    }

    pub fn with_outfit(mut self, image: ImageAsset) -> Self {
        self.outfit = Some(image);
        self
    }

    pub fn with_accessory(mut self, image: ImageAsset) -> Self {
        self.accessory = Some(image);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_video_style(mut self, video_style: VideoStyle) -> Self {
        self.video_style = video_style;
        self
    }

    /// True when any image at all will be attached to the request.
    pub fn has_attachments(&self) -> bool {
        !self.source_images.is_empty() || self.outfit.is_some() || self.accessory.is_some()
    }
}

/// Freeform art generation, optionally steered by references and an outfit.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub prompt: String,
    pub pose: Option<String>,
    pub fashion_style: Option<String>,
    pub reference_images: Vec<ImageAsset>,
    pub outfit: Option<ImageAsset>,
    pub aspect_ratio: AspectRatio,
    pub video_style: VideoStyle,
}

impl CreateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            pose: None,
            fashion_style: None,
            reference_images: Vec::new(),
            outfit: None,
            aspect_ratio: AspectRatio::Square,
            video_style: VideoStyle::default(),
        }
    }

    pub fn with_reference_image(mut self, image: ImageAsset) -> Self {
        self.reference_images.push(image);
        self
    }

    pub fn with_outfit(mut self, image: ImageAsset) -> Self {
        self.outfit = Some(image);
        self
    }

    pub fn with_pose(mut self, pose: impl Into<String>) -> Self {
        self.pose = Some(pose.into());
        self
    }

    pub fn with_fashion_style(mut self, style: impl Into<String>) -> Self {
        self.fashion_style = Some(style.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_video_style(mut self, video_style: VideoStyle) -> Self {
        self.video_style = video_style;
        self
    }

    /// User prompt with the optional pose and fashion-style lines appended.
    pub fn composed_prompt(&self) -> String {
        let mut details = Vec::new();
        if let Some(pose) = self.pose.as_deref().filter(|p| !p.trim().is_empty()) {
            details.push(format!("[POSE/ACTION]: {}", pose));
        }
        if let Some(style) = self.fashion_style.as_deref().filter(|s| !s.trim().is_empty()) {
            details.push(format!("[FASHION STYLE 2025]: {}", style));
        }

        if details.is_empty() {
            self.prompt.clone()
        } else {
            format!("{}\n\n{}", self.prompt, details.join("\n"))
        }
    }
}

/// Model + product compositing. Both primary images are mandatory.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub model_image: ImageAsset,
    pub product_image: ImageAsset,
    pub accessories: [Option<ImageAsset>; MAX_EDIT_ACCESSORIES],
    pub prompt: String,
    pub lock_details: bool,
}

impl EditRequest {
    pub fn new(model_image: ImageAsset, product_image: ImageAsset, prompt: impl Into<String>) -> Self {
        Self {
            model_image,
            product_image,
            accessories: [None, None],
            prompt: prompt.into(),
            lock_details: false,
        }
    }

    /// Build from optional form inputs, rejecting missing images or too many accessories.
    pub fn from_inputs(
        model_image: Option<ImageAsset>,
        product_image: Option<ImageAsset>,
        accessories: Vec<ImageAsset>,
        prompt: impl Into<String>,
        lock_details: bool,
    ) -> Result<Self> {
        let (Some(model_image), Some(product_image)) = (model_image, product_image) else {
            return Err(Error::Validation(ValidationIssue::MissingEditImages));
        };
        if accessories.len() > MAX_EDIT_ACCESSORIES {
            return Err(Error::Validation(ValidationIssue::TooManyAccessories {
                max: MAX_EDIT_ACCESSORIES,
            }));
        }

        let mut slots: [Option<ImageAsset>; MAX_EDIT_ACCESSORIES] = [None, None];
        for (slot, accessory) in slots.iter_mut().zip(accessories) {
            *slot = Some(accessory);
        }

        Ok(Self {
            model_image,
            product_image,
            accessories: slots,
            prompt: prompt.into(),
            lock_details,
        })
    }

    pub fn with_lock_details(mut self, lock_details: bool) -> Self {
        self.lock_details = lock_details;
        self
    }

    pub fn accessory_images(&self) -> impl Iterator<Item = &ImageAsset> {
        self.accessories.iter().flatten()
    }
}

/// Restoration of a single image, optionally guided by a face reference.
#[derive(Debug, Clone)]
pub struct UpscaleRequest {
    pub original: ImageAsset,
    pub face_reference: Option<ImageAsset>,
    pub lock_details: bool,
    pub prompt: Option<String>,
}

impl UpscaleRequest {
    pub fn new(original: ImageAsset) -> Self {
        Self {
            original,
            face_reference: None,
            lock_details: false,
            prompt: None,
        }
    }

    pub fn from_inputs(
        original: Option<ImageAsset>,
        face_reference: Option<ImageAsset>,
        lock_details: bool,
        prompt: Option<String>,
    ) -> Result<Self> {
        let original =
            original.ok_or(Error::Validation(ValidationIssue::MissingOriginalImage))?;
        Ok(Self {
            original,
            face_reference,
            lock_details,
            prompt,
        })
    }

    pub fn with_face_reference(mut self, image: ImageAsset) -> Self {
        self.face_reference = Some(image);
        self
    }

    pub fn with_lock_details(mut self, lock_details: bool) -> Self {
        self.lock_details = lock_details;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// One submission from the user, tagged by operation mode.
#[derive(Debug, Clone)]
pub enum OperationRequest {
    Generate(GenerateRequest),
    Create(CreateRequest),
    Edit(EditRequest),
    Upscale(UpscaleRequest),
}

impl OperationRequest {
    pub fn mode(&self) -> Mode {
        match self {
            OperationRequest::Generate(_) => Mode::Generate,
            OperationRequest::Create(_) => Mode::Create,
            OperationRequest::Edit(_) => Mode::Edit,
            OperationRequest::Upscale(_) => Mode::Upscale,
        }
    }

    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        match self {
            OperationRequest::Generate(req) => Some(req.aspect_ratio),
            OperationRequest::Create(req) => Some(req.aspect_ratio),
            OperationRequest::Edit(_) | OperationRequest::Upscale(_) => None,
        }
    }

    /// Checks that cannot be expressed in the types themselves.
    pub fn validate(&self) -> Result<()> {
        match self {
            OperationRequest::Generate(req) => {
                check_prompt(&req.prompt, &req.prompt, GENERATE_PROMPT_MAX_LENGTH)
            }
            OperationRequest::Create(req) => {
                check_prompt(&req.composed_prompt(), &req.prompt, CREATE_PROMPT_MAX_LENGTH)
            }
            OperationRequest::Edit(_) | OperationRequest::Upscale(_) => Ok(()),
        }
    }
}

/// `submitted` is the text sent to the model and must not be blank; the
/// character limit applies to the user-typed `typed` text only.
fn check_prompt(submitted: &str, typed: &str, max: usize) -> Result<()> {
    if submitted.trim().is_empty() {
        return Err(Error::Validation(ValidationIssue::EmptyPrompt));
    }
    let actual = typed.chars().count();
    if actual > max {
        return Err(Error::Validation(ValidationIssue::PromptTooLong { max, actual }));
    }
    Ok(())
}

// Configuration
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub use crate::ai::gemini::client::DEFAULT_BASE_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub output_dir: PathBuf,
    pub credential_file: PathBuf,
    pub locale: Locale,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let locale = match std::env::var("BANANA_LOCALE") {
            Ok(raw) => raw
                .parse()
                .map_err(Error::Config)?,
            Err(_) => Locale::default(),
        };

        let request_timeout = match std::env::var("BANANA_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "BANANA_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))
            })?)),
            Err(_) => None,
        };

        Ok(Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: std::env::var("BANANA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("BANANA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            output_dir: std::env::var("BANANA_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output")),
            credential_file: std::env::var("BANANA_CREDENTIAL_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_credential_file()),
            locale,
            request_timeout,
        })
    }
}

fn default_credential_file() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    home.join(".banana-studio").join("credentials.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ImageAsset {
        ImageAsset::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg", name)
    }

    #[test]
    fn test_aspect_ratio_parsing() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Widescreen);
        assert_eq!(" 3:4 ".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        let err = "2:1".parse::<AspectRatio>().unwrap_err();
        assert!(err.contains("1:1"));
    }

    #[test]
    fn test_video_style_accepts_slug_and_id() {
        assert_eq!(
            "neon-cyberpunk".parse::<VideoStyle>().unwrap(),
            VideoStyle::NeonCyberpunk
        );
        assert_eq!(
            "Macro Detail".parse::<VideoStyle>().unwrap(),
            VideoStyle::MacroDetail
        );
        assert!("vaporwave".parse::<VideoStyle>().is_err());
    }

    #[test]
    fn test_mode_defaults() {
        assert_eq!(GenerateRequest::new("x").aspect_ratio, AspectRatio::Portrait);
        assert_eq!(CreateRequest::new("x").aspect_ratio, AspectRatio::Square);
        assert!(Mode::Generate.is_multi_variant());
        assert!(!Mode::Upscale.is_multi_variant());
    }

    #[test]
    fn test_edit_requires_model_and_product() {
        let err = EditRequest::from_inputs(Some(asset("model.jpg")), None, vec![], "", false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationIssue::MissingEditImages)
        ));
    }

    #[test]
    fn test_edit_rejects_third_accessory() {
        let err = EditRequest::from_inputs(
            Some(asset("model.jpg")),
            Some(asset("product.jpg")),
            vec![asset("a.jpg"), asset("b.jpg"), asset("c.jpg")],
            "",
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationIssue::TooManyAccessories { max: 2 })
        ));
    }

    #[test]
    fn test_edit_fills_accessory_slots_in_order() {
        let req = EditRequest::from_inputs(
            Some(asset("model.jpg")),
            Some(asset("product.jpg")),
            vec![asset("bag.jpg")],
            "swap",
            true,
        )
        .unwrap();
        let names: Vec<&str> = req.accessory_images().map(|a| a.filename()).collect();
        assert_eq!(names, vec!["bag.jpg"]);
        assert!(req.accessories[1].is_none());
    }

    #[test]
    fn test_upscale_requires_original() {
        let err = UpscaleRequest::from_inputs(None, Some(asset("face.jpg")), true, None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationIssue::MissingOriginalImage)
        ));
    }

    #[test]
    fn test_blank_prompt_is_rejected() {
        let req = OperationRequest::Generate(GenerateRequest::new("   "));
        assert!(matches!(
            req.validate(),
            Err(Error::Validation(ValidationIssue::EmptyPrompt))
        ));
    }

    #[test]
    fn test_create_accepts_blank_text_with_pose_or_style() {
        let with_pose = OperationRequest::Create(
            CreateRequest::new("").with_pose("Walking Stride: confident runway walk"),
        );
        assert!(with_pose.validate().is_ok());

        let with_style = OperationRequest::Create(CreateRequest::new("  ").with_fashion_style("Quiet Luxury"));
        assert!(with_style.validate().is_ok());

        let nothing = OperationRequest::Create(CreateRequest::new(" ").with_pose("   "));
        assert!(matches!(
            nothing.validate(),
            Err(Error::Validation(ValidationIssue::EmptyPrompt))
        ));
    }

    #[test]
    fn test_create_limit_counts_typed_text_only() {
        let near_limit = "a".repeat(CREATE_PROMPT_MAX_LENGTH - 10);
        let req = OperationRequest::Create(
            CreateRequest::new(near_limit).with_pose("Walking Stride: confident runway walk"),
        );
        assert!(req.validate().is_ok());

        let over = OperationRequest::Create(
            CreateRequest::new("a".repeat(CREATE_PROMPT_MAX_LENGTH + 1)),
        );
        assert!(matches!(
            over.validate(),
            Err(Error::Validation(ValidationIssue::PromptTooLong {
                max: 2000,
                actual: 2001
            }))
        ));
    }

    #[test]
    fn test_composed_prompt_appends_details() {
        let req = CreateRequest::new("A rooftop party")
            .with_pose("Walking Stride")
            .with_fashion_style("All Black");
        assert_eq!(
            req.composed_prompt(),
            "A rooftop party\n\n[POSE/ACTION]: Walking Stride\n[FASHION STYLE 2025]: All Black"
        );
        assert_eq!(CreateRequest::new("plain").composed_prompt(), "plain");
    }
}
