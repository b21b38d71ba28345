//! Prompt templates and per-mode prompt assembly.
//!
//! Multi-variant modes yield one prompt per shot variant, always in
//! [`ShotKind::ORDER`]; callers map result index to label positionally.

use crate::models::{
    CreateRequest, EditRequest, GenerateRequest, OperationRequest, ShotKind, ShotVariant,
    UpscaleRequest,
};

pub const GENERATE_LOOKBOOK: &str = include_str!("../data/prompts/generate_lookbook.txt");
pub const GENERATE_IDENTITY: &str = include_str!("../data/prompts/generate_identity.txt");
pub const GENERATE_PURE: &str = include_str!("../data/prompts/generate_pure.txt");
pub const EDIT_COMPOSITING: &str = include_str!("../data/prompts/edit_compositing.txt");
pub const UPSCALE_RESTORE: &str = include_str!("../data/prompts/upscale_restore.txt");
pub const VIDEO_GENERATE: &str = include_str!("../data/prompts/video_generate.txt");
pub const VIDEO_CREATE: &str = include_str!("../data/prompts/video_create.txt");

pub const FACE_RESTORATION_CLAUSE: &str =
    "Face Restoration Mode: Use Face Ref to reconstruct facial details accurately.";
pub const IDENTITY_PRESERVATION_CLAUSE: &str = "Enhance facial details while preserving identity.";
pub const OUTFIT_WEAR_CLAUSE: &str =
    "Character must be wearing the exact outfit from the provided image.";

pub const PORTRAIT_SHOTS: [ShotVariant; 4] = [
    ShotVariant {
        kind: ShotKind::Wide,
        suffix: "(Wide Angle Shot: Full body view, showing the environment and context, cinematic composition).",
    },
    ShotVariant {
        kind: ShotKind::Medium,
        suffix: "(Medium Shot: Waist-up view, focus on the outfit details and pose, professional portrait lighting).",
    },
    ShotVariant {
        kind: ShotKind::CloseUp,
        suffix: "(Close-up Shot: Focus on face, makeup and expression, bokeh background, high detail texture).",
    },
    ShotVariant {
        kind: ShotKind::Artistic,
        suffix: "(Artistic Dutch Angle: Dynamic camera angle, dramatic lighting, fashion editorial style).",
    },
];

pub const CREATE_SHOTS: [ShotVariant; 4] = [
    ShotVariant {
        kind: ShotKind::Wide,
        suffix: "(Wide shot, showing full scene context).",
    },
    ShotVariant {
        kind: ShotKind::Medium,
        suffix: "(Medium shot, focus on main subject).",
    },
    ShotVariant {
        kind: ShotKind::CloseUp,
        suffix: "(Close-up detail shot).",
    },
    ShotVariant {
        kind: ShotKind::Artistic,
        suffix: "(Dynamic/Artistic angle).",
    },
];

/// Replace `{{key}}` placeholders in a template string.
///
/// Substitution runs in `vars` order, so user text should come last to keep
/// it from being scanned for placeholders.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Which Generate template a request falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateBranch {
    /// No attachments at all.
    Pure,
    /// Reference images without an outfit.
    DeepIdentity,
    /// An outfit image is attached.
    Lookbook,
}

impl GenerateBranch {
    pub fn for_request(req: &GenerateRequest) -> Self {
        if !req.has_attachments() {
            GenerateBranch::Pure
        } else if req.outfit.is_some() {
            GenerateBranch::Lookbook
        } else {
            GenerateBranch::DeepIdentity
        }
    }

    fn template(&self) -> &'static str {
        match self {
            GenerateBranch::Pure => GENERATE_PURE,
            GenerateBranch::DeepIdentity => GENERATE_IDENTITY,
            GenerateBranch::Lookbook => GENERATE_LOOKBOOK,
        }
    }
}

/// The shot catalog used by a mode, or `None` for single-prompt modes.
pub fn shot_variants(request: &OperationRequest) -> Option<&'static [ShotVariant; 4]> {
    match request {
        OperationRequest::Generate(_) => Some(&PORTRAIT_SHOTS),
        OperationRequest::Create(_) => Some(&CREATE_SHOTS),
        OperationRequest::Edit(_) | OperationRequest::Upscale(_) => None,
    }
}

/// Concrete prompts for a request: four for Generate/Create, one otherwise.
pub fn build_prompts(request: &OperationRequest) -> Vec<String> {
    match request {
        OperationRequest::Generate(req) => generate_prompts(req),
        OperationRequest::Create(req) => create_prompts(req),
        OperationRequest::Edit(req) => vec![edit_prompt(req)],
        OperationRequest::Upscale(req) => vec![upscale_prompt(req)],
    }
}

fn generate_prompts(req: &GenerateRequest) -> Vec<String> {
    let template = GenerateBranch::for_request(req).template();
    PORTRAIT_SHOTS
        .iter()
        .map(|variant| {
            render(template, &[("shot", variant.suffix), ("context", req.prompt.as_str())])
                .trim()
                .to_string()
        })
        .collect()
}

fn create_prompts(req: &CreateRequest) -> Vec<String> {
    let prompt = req.composed_prompt();
    CREATE_SHOTS
        .iter()
        .map(|variant| {
            let base = format!("{}. {}", prompt, variant.suffix);
            if req.outfit.is_some() {
                format!("{} {}", OUTFIT_WEAR_CLAUSE, base)
            } else {
                base
            }
        })
        .collect()
}

fn edit_prompt(req: &EditRequest) -> String {
    if req.lock_details {
        render(EDIT_COMPOSITING, &[("command", req.prompt.as_str())])
            .trim()
            .to_string()
    } else {
        req.prompt.clone()
    }
}

fn upscale_prompt(req: &UpscaleRequest) -> String {
    let mut sections = vec![UPSCALE_RESTORE.trim().to_string()];

    if req.lock_details {
        sections.push(if req.face_reference.is_some() {
            FACE_RESTORATION_CLAUSE.to_string()
        } else {
            IDENTITY_PRESERVATION_CLAUSE.to_string()
        });
    }
    if let Some(extra) = req.prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        sections.push(format!("Request: \"{}\"", extra));
    }

    sections.join("\n\n")
}

/// Companion video prompt derived from the user's text and style tag.
///
/// Only multi-variant modes produce one; it never depends on the remote call.
pub fn video_prompt(request: &OperationRequest) -> Option<String> {
    let (template, prompt, style) = match request {
        OperationRequest::Generate(req) => (VIDEO_GENERATE, req.prompt.clone(), req.video_style),
        OperationRequest::Create(req) => (VIDEO_CREATE, req.composed_prompt(), req.video_style),
        OperationRequest::Edit(_) | OperationRequest::Upscale(_) => return None,
    };

    Some(
        render(template, &[("style", style.as_str()), ("prompt", prompt.as_str())])
            .trim()
            .to_string(),
    )
}
