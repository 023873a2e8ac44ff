//! Typed error hierarchy for the easel pipeline.
//!
//! Three top-level enums cover the three subsystems:
//! - `GenerationError` — generation service calls and batch fan-out failures
//! - `PollError` — long-running job submission, polling, and resource fetch
//! - `SandboxError` — sandbox composition and runtime failures
//!
//! Sandbox errors never cross the host boundary as `Err`: the harness folds
//! them into a per-candidate `error` status on the channel. The enum exists
//! so the fold point has one place to render a message from.

use thiserror::Error;

/// Errors from the generation service and the batch orchestrator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Generation service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Generation service returned an empty response")]
    EmptyResponse,

    #[error("Generation call {index} of the batch failed: {message}")]
    Batch { index: usize, message: String },

    #[error("No API key configured (set EASEL_API_KEY or GEMINI_API_KEY)")]
    MissingApiKey,
}

impl GenerationError {
    /// Category-specific hint shown next to the verbatim error message.
    pub fn hint(&self) -> &'static str {
        match self {
            GenerationError::Transport(_) => "check your network connection",
            GenerationError::Service { status: 401 | 403, .. } => {
                "verify your API key and project access"
            }
            GenerationError::Service { status: 429, .. } => {
                "generation quota exhausted; wait before retrying"
            }
            GenerationError::Service { message, .. } if message.contains("SAFETY") => {
                "the prompt was rejected by content safety filters"
            }
            GenerationError::Service { .. } => "the generation service rejected the request",
            GenerationError::EmptyResponse => "the model returned no usable text; try rephrasing",
            GenerationError::Batch { .. } => "re-run the batch; no candidates were kept",
            GenerationError::MissingApiKey => "export EASEL_API_KEY before running",
        }
    }
}

/// Errors from the long-running job path (submit, poll, fetch).
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Generation service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Job failed: {message}")]
    Job { message: String },

    #[error("Job completed without a result reference")]
    MissingResult,
}

/// Errors raised while building or running one candidate's sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Failed to load addon '{id}': {message}")]
    AddonLoad { id: String, message: String },

    #[error("Failed to prepare sandbox workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Failed to spawn sandbox runtime: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Sandbox runtime exited without reporting a status{detail}")]
    NoReport { detail: String },

    #[error("Sandbox run exceeded the {secs}s watchdog timeout")]
    TimedOut { secs: u64 },

    #[error("Failed to wait for sandbox runtime: {0}")]
    Wait(#[source] std::io::Error),
}
