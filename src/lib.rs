//! Banana Studio - a client for identity-preserving portrait generation,
//! freeform art, product compositing and image restoration on Gemini.
//!
//! User input flows through image normalization, prompt templating and a
//! concurrent fan-out of remote calls, and ends up as session state that a
//! front end renders.

pub mod ai;
pub mod app;
pub mod credentials;
pub mod error;
pub mod image;
pub mod messages;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod session;

pub use error::{Error, Result};
