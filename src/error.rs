//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use crate::messages::Locale;
use thiserror::Error;

/// Why the remote model declined to produce an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefusalReason {
    /// Safety filters or policy blocks.
    Safety,
    /// Blocked as recitation of existing content.
    Recitation,
    /// The model answered with text instead of an image.
    ModelText(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Could not decode image '{filename}': {detail}")]
    Decode { filename: String, detail: String },

    #[error("Image '{filename}' is in a format that cannot be converted ({mime_type})")]
    UnsupportedFormat { filename: String, mime_type: String },

    #[error("Request refused by the model: {reason:?}")]
    SafetyRejected { reason: RefusalReason },

    #[error("Permission or quota error: {0}")]
    QuotaOrAuth(String),

    #[error("No image returned by the model")]
    NoImageReturned,

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Validation error: {0}")]
    Validation(ValidationIssue),

    #[error("No API key configured")]
    MissingCredential,

    #[error("Invalid API key: expected a key starting with \"AIza\"")]
    InvalidCredential,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

/// Local input problems caught before any remote call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("prompt is {actual} characters, limit is {max}")]
    PromptTooLong { max: usize, actual: usize },
    #[error("both a model image and a product image are required")]
    MissingEditImages,
    #[error("at most {max} accessory images are allowed")]
    TooManyAccessories { max: usize },
    #[error("an image to upscale is required")]
    MissingOriginalImage,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Human-readable text stored as the session error.
    pub fn user_message(&self, locale: Locale) -> String {
        crate::messages::error_message(self, locale)
    }

    /// True for errors raised by the remote model call itself.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::SafetyRejected { .. }
                | Error::QuotaOrAuth(_)
                | Error::NoImageReturned
                | Error::AiProvider(_)
        )
    }
}
