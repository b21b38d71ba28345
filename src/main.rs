use anyhow::{Context, Result};
use banana_studio::app::App;
use banana_studio::credentials::{
    build_time_key, CredentialGate, FileCredentialStore, Screen,
};
use banana_studio::image::ImageAsset;
use banana_studio::messages::{format_elapsed, Locale};
use banana_studio::models::{
    AspectRatio, Config, CreateRequest, EditRequest, GenerateRequest, OperationRequest,
    UpscaleRequest, VideoStyle,
};
use banana_studio::session::{SessionSnapshot, SessionState};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "banana-studio")]
#[command(about = "Generate, create, edit and upscale images with Gemini")]
struct CliArgs {
    /// Directory results are written to (overrides BANANA_OUTPUT_DIR).
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Language for progress and error messages: en or vi.
    #[arg(long, global = true, value_parser = parse_locale_arg)]
    locale: Option<Locale>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Four portrait angles, optionally preserving a reference identity.
    Generate {
        #[arg(long)]
        prompt: String,
        /// Reference face photo; repeat for several.
        #[arg(long = "face")]
        faces: Vec<PathBuf>,
        #[arg(long)]
        outfit: Option<PathBuf>,
        #[arg(long)]
        accessory: Option<PathBuf>,
        #[arg(long, default_value = "3:4", value_parser = parse_aspect_ratio_arg)]
        aspect_ratio: AspectRatio,
        #[arg(long, default_value = "cinematic-luxury", value_parser = parse_video_style_arg)]
        video_style: VideoStyle,
    },
    /// Four freeform artistic variations.
    Create {
        /// May be left empty when a pose or fashion style is given.
        #[arg(long, default_value = "")]
        prompt: String,
        #[arg(long)]
        pose: Option<String>,
        #[arg(long)]
        fashion_style: Option<String>,
        #[arg(long = "reference")]
        references: Vec<PathBuf>,
        #[arg(long)]
        outfit: Option<PathBuf>,
        #[arg(long, default_value = "1:1", value_parser = parse_aspect_ratio_arg)]
        aspect_ratio: AspectRatio,
        #[arg(long, default_value = "cinematic-luxury", value_parser = parse_video_style_arg)]
        video_style: VideoStyle,
    },
    /// Composite a product onto a model photo.
    Edit {
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        product: Option<PathBuf>,
        #[arg(long = "accessory")]
        accessories: Vec<PathBuf>,
        #[arg(long, default_value = "")]
        prompt: String,
        #[arg(long)]
        lock_details: bool,
    },
    /// Restore and upscale a single image.
    Upscale {
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        face_ref: Option<PathBuf>,
        #[arg(long)]
        lock_details: bool,
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Cut the subject out onto a transparent background.
    RemoveBg { image: PathBuf },
    /// Extract the worn outfit as a flat-lay product shot.
    IsolateOutfit { image: PathBuf },
    /// Store an API key; prompts on stdin when omitted.
    Login { key: Option<String> },
    /// Forget the stored API key.
    Logout,
}

fn parse_aspect_ratio_arg(input: &str) -> std::result::Result<AspectRatio, String> {
    input.parse()
}

fn parse_video_style_arg(input: &str) -> std::result::Result<VideoStyle, String> {
    input.parse()
}

fn parse_locale_arg(input: &str) -> std::result::Result<Locale, String> {
    input.parse()
}

fn load_asset(path: &Path) -> Result<ImageAsset> {
    ImageAsset::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_optional(path: Option<&PathBuf>) -> Result<Option<ImageAsset>> {
    path.map(|p| load_asset(p)).transpose()
}

fn read_line(prompt: &str) -> Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Ask for a key until one validates or stdin runs dry.
fn credential_entry(gate: &CredentialGate, locale: Locale) -> Result<String> {
    loop {
        let entered = read_line("Gemini API key: ")?;
        if entered.is_empty() {
            anyhow::bail!(banana_studio::Error::MissingCredential.user_message(locale));
        }
        match gate.login(&entered) {
            Ok(key) => return Ok(key),
            Err(e) => eprintln!("{}", e.user_message(locale)),
        }
    }
}

fn render_progress(snapshot: &SessionSnapshot) {
    if let SessionState::Loading { message, .. } = &snapshot.state {
        eprint!("\r{} {}", message, format_elapsed(snapshot.elapsed_secs));
        let _ = io::stderr().flush();
    }
}

async fn run_operation(app: &mut App, request: Result<OperationRequest>) -> Result<()> {
    let request = match request {
        Ok(request) => request,
        Err(e) => match e.downcast::<banana_studio::Error>() {
            Ok(local) => {
                let snapshot = app.reject(&local);
                return report(app, snapshot);
            }
            Err(other) => return Err(other),
        },
    };

    let mut rx = app.subscribe();
    let progress = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            if !snapshot.state.is_loading() {
                break;
            }
            render_progress(&snapshot);
        }
    });

    let snapshot = app.submit(request).await;
    progress.abort();
    eprintln!();
    report(app, snapshot)
}

fn report(app: &App, snapshot: SessionSnapshot) -> Result<()> {
    match snapshot.state {
        SessionState::Succeeded(result) => {
            for (path, image) in app.save_results(&result)?.iter().zip(&result.images) {
                match image.label {
                    Some(label) => println!("{:<9} {}", label, path.display()),
                    None => println!("{}", path.display()),
                }
            }
            if let Some(video_prompt) = &result.video_prompt {
                println!("\nVideo prompt:\n{}", video_prompt);
            }
            info!("Finished in {}", format_elapsed(result.elapsed_secs));
            Ok(())
        }
        SessionState::Failed { message } => anyhow::bail!(message),
        other => anyhow::bail!("Session ended in unexpected state: {:?}", other),
    }
}

fn build_request(command: &Command) -> Result<OperationRequest> {
    let request = match command {
        Command::Generate {
            prompt,
            faces,
            outfit,
            accessory,
            aspect_ratio,
            video_style,
        } => {
            let mut req = GenerateRequest::new(prompt.as_str())
                .with_aspect_ratio(*aspect_ratio)
                .with_video_style(*video_style);
            for face in faces {
                req = req.with_source_image(load_asset(face)?);
            }
            if let Some(outfit) = load_optional(outfit.as_ref())? {
                req = req.with_outfit(outfit);
            }
            if let Some(accessory) = load_optional(accessory.as_ref())? {
                req = req.with_accessory(accessory);
            }
            OperationRequest::Generate(req)
        }
        Command::Create {
            prompt,
            pose,
            fashion_style,
            references,
            outfit,
            aspect_ratio,
            video_style,
        } => {
            let mut req = CreateRequest::new(prompt.as_str())
                .with_aspect_ratio(*aspect_ratio)
                .with_video_style(*video_style);
            if let Some(pose) = pose {
                req = req.with_pose(pose.as_str());
            }
            if let Some(style) = fashion_style {
                req = req.with_fashion_style(style.as_str());
            }
            for reference in references {
                req = req.with_reference_image(load_asset(reference)?);
            }
            if let Some(outfit) = load_optional(outfit.as_ref())? {
                req = req.with_outfit(outfit);
            }
            OperationRequest::Create(req)
        }
        Command::Edit {
            model,
            product,
            accessories,
            prompt,
            lock_details,
        } => {
            let accessories = accessories
                .iter()
                .map(|p| load_asset(p))
                .collect::<Result<Vec<_>>>()?;
            OperationRequest::Edit(EditRequest::from_inputs(
                load_optional(model.as_ref())?,
                load_optional(product.as_ref())?,
                accessories,
                prompt.as_str(),
                *lock_details,
            )?)
        }
        Command::Upscale {
            image,
            face_ref,
            lock_details,
            prompt,
        } => OperationRequest::Upscale(UpscaleRequest::from_inputs(
            load_optional(image.as_ref())?,
            load_optional(face_ref.as_ref())?,
            *lock_details,
            prompt.clone(),
        )?),
        other => anyhow::bail!("{:?} is not an image operation", other),
    };
    Ok(request)
}

async fn run(args: CliArgs) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(locale) = args.locale {
        config.locale = locale;
    }

    let gate = CredentialGate::new(
        Box::new(FileCredentialStore::new(config.credential_file.clone())),
        config.api_key.clone().or_else(build_time_key),
    );

    match &args.command {
        Command::Login { key } => {
            match key {
                Some(key) => {
                    gate.login(key)
                        .map_err(|e| anyhow::anyhow!(e.user_message(config.locale)))?;
                }
                None => {
                    credential_entry(&gate, config.locale)?;
                }
            }
            println!("API key saved to {}", config.credential_file.display());
            return Ok(());
        }
        Command::Logout => {
            gate.logout()?;
            println!("API key removed");
            return Ok(());
        }
        _ => {}
    }

    let api_key = match gate.screen()? {
        Screen::Main { credential } => credential,
        Screen::CredentialEntry => credential_entry(&gate, config.locale)?,
    };
    let mut app = App::from_config(&config, api_key)?;

    match &args.command {
        Command::RemoveBg { image } => {
            let cut = app.remove_background(&load_asset(image)?).await?;
            println!("{}", app.save_asset(&cut)?.display());
            Ok(())
        }
        Command::IsolateOutfit { image } => {
            let outfit = app.isolate_clothing(&load_asset(image)?).await?;
            println!("{}", app.save_asset(&outfit)?.display());
            Ok(())
        }
        command => run_operation(&mut app, build_request(command)).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banana_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aspect_ratio_arg() {
        assert_eq!(parse_aspect_ratio_arg("9:16").unwrap(), AspectRatio::Story);
        let err = parse_aspect_ratio_arg("21:9").unwrap_err();
        assert!(err.contains("21:9"));
    }

    #[test]
    fn test_parse_video_style_arg() {
        assert_eq!(
            parse_video_style_arg("fast-paced-tiktok").unwrap(),
            VideoStyle::FastPacedTikTok
        );
        assert!(parse_video_style_arg("sepia").is_err());
    }

    #[test]
    fn test_parse_locale_arg() {
        assert_eq!(parse_locale_arg("vi").unwrap(), Locale::Vi);
        assert!(parse_locale_arg("fr").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let args = CliArgs::try_parse_from(["banana-studio", "generate", "--prompt", "x"]).unwrap();
        match args.command {
            Command::Generate {
                aspect_ratio,
                video_style,
                faces,
                ..
            } => {
                assert_eq!(aspect_ratio, AspectRatio::Portrait);
                assert_eq!(video_style, VideoStyle::CinematicLuxury);
                assert!(faces.is_empty());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_edit_without_product_is_local_validation_error() {
        let command = Command::Edit {
            model: None,
            product: None,
            accessories: vec![],
            prompt: "x".to_string(),
            lock_details: false,
        };
        let err = build_request(&command).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<banana_studio::Error>(),
            Some(banana_studio::Error::Validation(_))
        ));
    }
}
