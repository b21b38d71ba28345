//! Per-submission session state.
//!
//! [`SessionController`] owns the only writer of the session state and moves
//! it through `Idle -> Loading -> Succeeded | Failed`. Observers follow along
//! through a [`watch`] channel. The one-second elapsed counter is a spawned
//! ticker that lives exactly as long as the Loading state.

use crate::ai::GeneratedImage;
use crate::messages::{progress_message, Locale};
use crate::models::{Mode, OperationRequest, ShotKind};
use crate::orchestrator::Orchestrator;
use crate::prompts;
use crate::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info};

/// One displayable result image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultImage {
    /// Shot label for multi-variant modes, `None` for single results.
    pub label: Option<&'static str>,
    pub data_uri: String,
}

impl ResultImage {
    pub fn mime_type(&self) -> &str {
        self.data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or("application/octet-stream")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub mode: Mode,
    pub images: Vec<ResultImage>,
    pub video_prompt: Option<String>,
    pub elapsed_secs: u64,
}

impl GenerationResult {
    fn assemble(
        request: &OperationRequest,
        generated: Vec<GeneratedImage>,
        elapsed_secs: u64,
    ) -> Self {
        let mode = request.mode();
        let mime_type = if mode.is_multi_variant() {
            "image/jpeg"
        } else {
            "image/png"
        };

        let images = generated
            .into_iter()
            .enumerate()
            .map(|(index, image)| ResultImage {
                label: mode
                    .is_multi_variant()
                    .then(|| ShotKind::ORDER.get(index).map(ShotKind::label))
                    .flatten(),
                data_uri: format!("data:{};base64,{}", mime_type, image.data),
            })
            .collect();

        Self {
            mode,
            images,
            video_prompt: prompts::video_prompt(request),
            elapsed_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading {
        mode: Mode,
        message: &'static str,
    },
    Succeeded(GenerationResult),
    Failed {
        message: String,
    },
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub elapsed_secs: u64,
}

pub struct SessionController {
    orchestrator: Arc<Orchestrator>,
    locale: Locale,
    state: Arc<watch::Sender<SessionSnapshot>>,
    ticker: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(orchestrator: Arc<Orchestrator>, locale: Locale) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            orchestrator,
            locale,
            state: Arc::new(state),
            ticker: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Run one submission to completion and return the terminal snapshot.
    ///
    /// Prior results are discarded the moment a new submission starts.
    /// Requests that fail local validation go straight to Failed without
    /// entering Loading.
    pub async fn submit(&mut self, request: OperationRequest) -> SessionSnapshot {
        if let Err(e) = request.validate() {
            return self.reject(&e);
        }

        let mode = request.mode();
        info!("Submitting {} request", mode);
        self.state.send_replace(SessionSnapshot {
            state: SessionState::Loading {
                mode,
                message: progress_message(&request, self.locale),
            },
            elapsed_secs: 0,
        });
        let started = Instant::now();
        self.start_ticker(started);

        let outcome = self.orchestrator.run(&request).await;
        self.stop_ticker();
        let elapsed_secs = started.elapsed().as_secs();

        let state = match outcome {
            Ok(generated) => {
                info!(
                    "{} finished with {} image(s) in {}s",
                    mode,
                    generated.len(),
                    elapsed_secs
                );
                SessionState::Succeeded(GenerationResult::assemble(
                    &request,
                    generated,
                    elapsed_secs,
                ))
            }
            Err(e) => {
                error!("{} failed after {}s: {}", mode, elapsed_secs, e);
                SessionState::Failed {
                    message: e.user_message(self.locale),
                }
            }
        };

        self.state.send_replace(SessionSnapshot {
            state,
            elapsed_secs,
        });
        self.snapshot()
    }

    /// Record a failure caught before submission, e.g. a form missing a required image.
    pub fn reject(&mut self, error: &Error) -> SessionSnapshot {
        self.stop_ticker();
        info!("Rejected submission locally: {}", error);
        self.state.send_replace(SessionSnapshot {
            state: SessionState::Failed {
                message: error.user_message(self.locale),
            },
            elapsed_secs: 0,
        });
        self.snapshot()
    }

    fn start_ticker(&mut self, started: Instant) {
        self.stop_ticker();
        let state = Arc::clone(&self.state);
        self.ticker = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = tokio::time::interval_at(started + period, period);
            loop {
                interval.tick().await;
                state.send_modify(|snapshot| {
                    if snapshot.state.is_loading() {
                        snapshot.elapsed_secs = started.elapsed().as_secs();
                    }
                });
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
