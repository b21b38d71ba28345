//! User-facing text: progress messages and localized error descriptions.

use crate::error::{RefusalReason, ValidationIssue};
use crate::models::OperationRequest;
use crate::Error;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Vi,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Locale::En),
            "vi" | "vi-vn" | "vietnamese" => Ok(Locale::Vi),
            other => Err(format!("Unsupported locale '{}'. Expected 'en' or 'vi'", other)),
        }
    }
}

/// Static progress text shown while a request of this shape is in flight.
pub fn progress_message(request: &OperationRequest, locale: Locale) -> &'static str {
    match (request, locale) {
        (OperationRequest::Generate(req), Locale::En) => {
            if req.source_images.is_empty() {
                "Generating 4 camera angles..."
            } else if req.outfit.is_some() {
                "Fusing face identity into the outfit (4 variants)..."
            } else {
                "Initializing identity adapter from reference faces..."
            }
        }
        (OperationRequest::Generate(req), Locale::Vi) => {
            if req.source_images.is_empty() {
                "Banana AI đang sáng tạo 4 góc máy..."
            } else if req.outfit.is_some() {
                "Lora Fusion: Đồng bộ Face ID vào Outfit (4 Biến thể)..."
            } else {
                "Đang khởi tạo Lora Adapter: Train nóng dữ liệu khuôn mặt..."
            }
        }
        (OperationRequest::Create(_), Locale::En) => "Painting 4 artistic variations...",
        (OperationRequest::Create(_), Locale::Vi) => "Banana Nano đang vẽ 4 bức tranh nghệ thuật...",
        (OperationRequest::Edit(_), Locale::En) => "Compositing model and product in the studio...",
        (OperationRequest::Edit(_), Locale::Vi) => {
            "Banana AI đang thực hiện ghép ảnh Studio chuyên nghiệp..."
        }
        (OperationRequest::Upscale(_), Locale::En) => "Reconstructing image detail...",
        (OperationRequest::Upscale(_), Locale::Vi) => "Banana AI đang tái tạo chi tiết ảnh...",
    }
}

pub(crate) fn error_message(error: &Error, locale: Locale) -> String {
    match locale {
        Locale::En => english(error),
        Locale::Vi => vietnamese(error),
    }
}

fn english(error: &Error) -> String {
    match error {
        Error::Decode { filename, .. } => format!(
            "Could not read image '{}'. Please choose a different file.",
            filename
        ),
        Error::UnsupportedFormat { filename, mime_type } => format!(
            "'{}' is a {} image, which is not supported. Please convert it to JPEG or PNG first.",
            filename, mime_type
        ),
        Error::SafetyRejected { reason } => match reason {
            RefusalReason::Safety => {
                "The image or description violates the model's safety policy. Try a less sensitive image or describe the outfit more clearly.".to_string()
            }
            RefusalReason::Recitation => {
                "The request was blocked for reproducing copyrighted or repeated content.".to_string()
            }
            RefusalReason::ModelText(text) => format!("The model replied with text instead of an image: {}", text),
        },
        Error::QuotaOrAuth(_) => {
            "The API key was rejected or its quota is exhausted. Check the key and try again.".to_string()
        }
        Error::NoImageReturned => "The model did not return an image.".to_string(),
        Error::Validation(issue) => match issue {
            ValidationIssue::EmptyPrompt => "Please enter a description.".to_string(),
            ValidationIssue::PromptTooLong { max, actual } => {
                format!("The description is too long ({}/{} characters).", actual, max)
            }
            ValidationIssue::MissingEditImages => {
                "Please upload both a model image and a product image.".to_string()
            }
            ValidationIssue::TooManyAccessories { max } => {
                format!("At most {} accessory images can be attached.", max)
            }
            ValidationIssue::MissingOriginalImage => "Please upload an image to upscale.".to_string(),
        },
        Error::MissingCredential => "Please enter an API key.".to_string(),
        Error::InvalidCredential => {
            "Invalid API key (keys usually start with \"AIza\").".to_string()
        }
        other => format!("The image service ran into a problem. {}", other),
    }
}

fn vietnamese(error: &Error) -> String {
    match error {
        Error::Decode { filename, .. } => format!(
            "Không thể đọc ảnh '{}'. Vui lòng chọn ảnh khác.",
            filename
        ),
        Error::UnsupportedFormat { filename, mime_type } => format!(
            "Ảnh '{}' có định dạng {} chưa được hỗ trợ. Vui lòng chuyển sang JPEG hoặc PNG.",
            filename, mime_type
        ),
        Error::SafetyRejected { reason } => match reason {
            RefusalReason::Safety => {
                "Ảnh hoặc mô tả vi phạm tiêu chuẩn cộng đồng của Google AI. Vui lòng thử ảnh khác ít nhạy cảm hơn hoặc chụp rõ trang phục hơn.".to_string()
            }
            RefusalReason::Recitation => {
                "Yêu cầu bị chặn do vi phạm bản quyền hoặc nội dung lặp lại.".to_string()
            }
            RefusalReason::ModelText(text) => format!("Banana AI phản hồi văn bản: {}", text),
        },
        Error::QuotaOrAuth(_) => {
            "API Key bị từ chối hoặc đã hết hạn mức sử dụng. Vui lòng kiểm tra lại API Key.".to_string()
        }
        Error::NoImageReturned => "Không nhận được hình ảnh từ Banana AI.".to_string(),
        Error::Validation(issue) => match issue {
            ValidationIssue::EmptyPrompt => "Vui lòng nhập mô tả.".to_string(),
            ValidationIssue::PromptTooLong { max, actual } => {
                format!("Mô tả quá dài ({}/{} ký tự).", actual, max)
            }
            ValidationIssue::MissingEditImages => {
                "Vui lòng tải lên cả ảnh người mẫu và ảnh sản phẩm.".to_string()
            }
            ValidationIssue::TooManyAccessories { max } => {
                format!("Chỉ được thêm tối đa {} ảnh phụ kiện.", max)
            }
            ValidationIssue::MissingOriginalImage => "Vui lòng tải lên ảnh cần nâng cấp.".to_string(),
        },
        Error::MissingCredential => "Vui lòng nhập API Key.".to_string(),
        Error::InvalidCredential => {
            "API Key không hợp lệ (thường bắt đầu bằng \"AIza\").".to_string()
        }
        other => format!("Banana AI gặp sự cố. {}", other),
    }
}

/// Formats elapsed seconds as `MM:SS`.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
