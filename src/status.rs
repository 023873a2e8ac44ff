//! One-way status channel from sandbox runs to the host.
//!
//! Each sandbox reports its lifecycle as identity-tagged [`StatusMessage`]s.
//! The host owns a [`StatusTable`] keyed by candidate id and applies messages
//! by key: last write wins, duplicates are harmless, and a message for a
//! candidate that is no longer live is discarded. The channel carries no
//! capability; a sandbox can only report facts about its own lifecycle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, RunStatus};

/// Status a sandbox run can report. `idle` never crosses the channel; it is
/// a host-side state only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    Loading,
    Success,
    Error,
}

impl SandboxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SandboxStatus::Success | SandboxStatus::Error)
    }
}

impl From<SandboxStatus> for RunStatus {
    fn from(status: SandboxStatus) -> Self {
        match status {
            SandboxStatus::Loading => RunStatus::Loading,
            SandboxStatus::Success => RunStatus::Success,
            SandboxStatus::Error => RunStatus::Error,
        }
    }
}

/// Wire shape of one status message.
///
/// `candidateId` must round-trip exactly as assigned; it is the only thing
/// tying a message to a candidate. `message` is only meaningful when
/// `status` is `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub kind: String,
    pub candidate_id: CandidateId,
    pub status: SandboxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusMessage {
    pub const KIND: &'static str = "status";

    pub fn loading(candidate_id: CandidateId) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            candidate_id,
            status: SandboxStatus::Loading,
            message: None,
        }
    }

    pub fn success(candidate_id: CandidateId) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            candidate_id,
            status: SandboxStatus::Success,
            message: None,
        }
    }

    pub fn error(candidate_id: CandidateId, message: impl Into<String>) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            candidate_id,
            status: SandboxStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_status(&self) -> bool {
        self.kind == Self::KIND
    }
}

/// Latest known state for one live candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateState {
    pub status: RunStatus,
    pub message: Option<String>,
}

impl Default for CandidateState {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            message: None,
        }
    }
}

/// Host-owned table of per-candidate status.
///
/// The table is the only state shared across concurrent sandbox runs. It is
/// mutated exclusively through [`StatusTable::apply`]; there is no ambient
/// global: whoever constructs sandboxes holds the table (or the receiving
/// end of the channel feeding it) explicitly.
#[derive(Debug, Default)]
pub struct StatusTable {
    entries: HashMap<CandidateId, CandidateState>,
    discarded: u64,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a candidate live. Its state starts at `idle`.
    pub fn register(&mut self, id: CandidateId) {
        self.entries.entry(id).or_default();
    }

    /// Remove a candidate; later messages for its id are discarded.
    pub fn deregister(&mut self, id: CandidateId) {
        self.entries.remove(&id);
    }

    /// Apply one incoming message by key. Returns whether it changed state.
    ///
    /// Messages with an unknown kind or an id that is not live are dropped
    /// silently; a sandbox for a replaced candidate may still be tearing
    /// down, and its late reports must not corrupt the table.
    pub fn apply(&mut self, message: &StatusMessage) -> bool {
        if !message.is_status() {
            self.discarded += 1;
            tracing::debug!(kind = %message.kind, "discarding message with unknown kind");
            return false;
        }
        match self.entries.get_mut(&message.candidate_id) {
            Some(state) => {
                state.status = message.status.into();
                state.message = message.message.clone();
                true
            }
            None => {
                self.discarded += 1;
                tracing::debug!(
                    candidate = %message.candidate_id,
                    "discarding status for candidate that is not live"
                );
                false
            }
        }
    }

    pub fn get(&self, id: CandidateId) -> Option<&CandidateState> {
        self.entries.get(&id)
    }

    pub fn is_live(&self, id: CandidateId) -> bool {
        self.entries.contains_key(&id)
    }

    /// True once every registered candidate reached a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.entries.values().all(|state| state.status.is_terminal())
    }

    /// Count of messages dropped for stale ids or unknown kinds.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
