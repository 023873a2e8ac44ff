//! Candidate data model shared by the generation and render pipeline.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier for one generated candidate.
///
/// Ids are drawn from a monotonic counter at creation time and stay stable
/// for the candidate's lifetime. The id is the correlation key for status
/// messages coming back from a sandbox, so it serializes transparently and
/// round-trips through JSON exactly as assigned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate-{}", self.0)
    }
}

/// Monotonic id source. One generator covers one candidate set; ids are
/// never reused within it.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> CandidateId {
        CandidateId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a candidate's most recent sandbox run.
///
/// `Idle` means no run has been attempted, or the source was edited since
/// the last run. `Success` and `Error` are terminal for one run; a re-render
/// restarts at `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Loading => write!(f, "loading"),
            RunStatus::Success => write!(f, "success"),
            RunStatus::Error => write!(f, "error"),
        }
    }
}

/// One generated program plus its metadata and lifecycle status.
///
/// `source_code` is the only mutable piece of content, and only through
/// [`Candidate::edit_source`], which resets the lifecycle; a stale terminal
/// status never describes edited code. The raw service response is kept
/// untouched as an audit trail.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: CandidateId,
    source_code: String,
    raw_response_text: String,
    status: RunStatus,
    last_error: Option<String>,
}

impl Candidate {
    pub fn new(
        id: CandidateId,
        raw_response_text: impl Into<String>,
        source_code: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source_code: source_code.into(),
            raw_response_text: raw_response_text.into(),
            status: RunStatus::Idle,
            last_error: None,
        }
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    /// Full, unmodified text returned by the generation service.
    pub fn raw_response_text(&self) -> &str {
        &self.raw_response_text
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Present only while `status() == RunStatus::Error`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace the program text. Invalidates any prior run outcome.
    pub fn edit_source(&mut self, source: impl Into<String>) {
        self.source_code = source.into();
        self.status = RunStatus::Idle;
        self.last_error = None;
    }

    pub fn mark_loading(&mut self) {
        self.status = RunStatus::Loading;
        self.last_error = None;
    }

    pub fn mark_success(&mut self) {
        self.status = RunStatus::Success;
        self.last_error = None;
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = RunStatus::Error;
        self.last_error = Some(message.into());
    }
}
