//! Boundary to the external code-generation service.
//!
//! The [`GenerationService`] trait is the seam the orchestrator and poller
//! are written against; [`gemini::GeminiClient`] is the REST implementation.
//! Tests substitute hand-rolled mocks.

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{GenerationError, PollError};

/// Default number of concurrent candidates per batch.
pub const DEFAULT_FAN_OUT: usize = 3;

/// Sampling configuration forwarded verbatim to the service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_k: 64,
            top_p: 0.95,
        }
    }
}

/// Optional reference image attached to a prompt.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// One user intent, fanned out into a batch of identical calls.
///
/// Ephemeral: not retained once the batch completes.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<ReferenceImage>,
    pub sampling: SamplingConfig,
    /// Concurrency degree of the batch.
    pub fan_out: usize,
}

impl GenerationRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            sampling: SamplingConfig::default(),
            fan_out: DEFAULT_FAN_OUT,
        }
    }
}

/// Raw outcome of one generation call: the full response text plus whatever
/// structured metadata the service chose to attach.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub text: String,
    pub model_version: Option<String>,
}

/// Opaque handle to a long-running job. Each poll response may replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(pub String);

/// Opaque reference to a finished job's result, resolvable to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRef(pub String);

/// Snapshot of a long-running job. `result` is only present once `done`.
#[derive(Debug, Clone)]
pub struct Operation {
    pub handle: OperationHandle,
    pub done: bool,
    pub result: Option<ResultRef>,
}

/// The request/response and long-running-job surface of the service.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// One synchronous generation call.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError>;

    /// Submit a job whose result is not available synchronously.
    async fn start_video_job(
        &self,
        request: &GenerationRequest,
    ) -> Result<OperationHandle, PollError>;

    /// Fetch the current state of a job.
    async fn poll_operation(&self, handle: &OperationHandle) -> Result<Operation, PollError>;

    /// Resolve a terminal job's result reference into displayable bytes.
    async fn fetch_resource(&self, result: &ResultRef) -> Result<Vec<u8>, PollError>;
}
