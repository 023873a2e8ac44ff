//! Sandbox harness: isolated execution of one candidate's program.
//!
//! Each run composes an execution document, spawns the configured JavaScript
//! runtime on it in a throwaway working directory with a scrubbed
//! environment, and interprets the identity-tagged status lines the child
//! prints. All observable effects of a run leave the boundary through the
//! status channel; an execution failure is contained entirely within one
//! candidate's `error` status and never escalates to the host. Harnesses for
//! different candidates are fully independent.

pub mod document;

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

use crate::addons::{self, LibraryAddon};
use crate::candidate::{Candidate, CandidateId};
use crate::errors::SandboxError;
use crate::status::StatusMessage;

use document::DocumentSpec;

/// Settings for the sandbox runtime.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Command that evaluates the execution document (a JavaScript runtime).
    pub runtime: String,
    /// Arguments placed before the document path.
    pub runtime_args: Vec<String>,
    /// Delay between successful evaluation and the `success` report, giving
    /// asynchronous first-frame setup a chance to surface a late error.
    pub settle_ms: u64,
    /// Watchdog ceiling for one run; a hung runtime becomes an `error`.
    pub timeout_secs: u64,
    /// How many `draw` frames the driver evaluates.
    pub frame_budget: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: "node".to_string(),
            runtime_args: Vec::new(),
            settle_ms: 600,
            timeout_secs: 30,
            frame_budget: 60,
        }
    }
}

/// Runs one candidate at a time inside an isolated execution context and
/// reports its lifecycle through the status channel.
pub struct SandboxHarness {
    config: SandboxConfig,
    http: reqwest::Client,
    status_tx: mpsc::UnboundedSender<StatusMessage>,
}

impl SandboxHarness {
    pub fn new(config: SandboxConfig, status_tx: mpsc::UnboundedSender<StatusMessage>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            status_tx,
        }
    }

    /// Execute one candidate with the given addon selection.
    ///
    /// Emits `loading` immediately, then exactly one terminal status. Every
    /// internal failure (addon resolution, workspace setup, spawn, a silent
    /// or hung child) folds into the `error` status; the host never sees an
    /// `Err`. Returns the terminal message for the caller's convenience.
    pub async fn run(&self, candidate: &Candidate, addons: &[LibraryAddon]) -> StatusMessage {
        let id = candidate.id;
        self.emit(StatusMessage::loading(id));

        let terminal = match self.try_run(candidate, addons).await {
            Ok(terminal) => terminal,
            Err(err) => StatusMessage::error(id, err.to_string()),
        };
        self.emit(terminal.clone());
        terminal
    }

    async fn try_run(
        &self,
        candidate: &Candidate,
        addons: &[LibraryAddon],
    ) -> Result<StatusMessage, SandboxError> {
        let mut resolved = Vec::with_capacity(addons.len());
        for addon in addons {
            let source = addons::resolve_source(addon, &self.http).await?;
            resolved.push((addon.id.clone(), source));
        }

        let raw = candidate.source_code();
        let source = if document::has_entry_point(raw) {
            raw.to_string()
        } else {
            document::wrap_source(raw)
        };
        let doc = document::compose_document(&DocumentSpec {
            candidate_id: candidate.id,
            source: &source,
            addons: &resolved,
            settle_ms: self.config.settle_ms,
            frame_budget: self.config.frame_budget,
        });

        let workdir = tempfile::tempdir().map_err(SandboxError::Workspace)?;
        let program = workdir.path().join("sketch.js");
        tokio::fs::write(&program, &doc)
            .await
            .map_err(SandboxError::Workspace)?;

        self.execute(candidate.id, &program, workdir.path()).await
    }

    /// Spawn the runtime on a composed document and wait for its verdict.
    async fn execute(
        &self,
        id: CandidateId,
        program: &Path,
        workdir: &Path,
    ) -> Result<StatusMessage, SandboxError> {
        let mut cmd = Command::new(&self.config.runtime);
        cmd.args(&self.config.runtime_args)
            .arg(program)
            .current_dir(workdir)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The runtime itself still has to be findable.
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }

        let mut child = cmd.spawn().map_err(SandboxError::Spawn)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::Spawn(io::Error::other("child stdout not captured")))?;

        let deadline = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(deadline, read_terminal_status(stdout, id)).await {
            Ok(Some(terminal)) => {
                // The run is decided; the child has nothing left to say.
                let _ = child.kill().await;
                Ok(terminal)
            }
            Ok(None) => {
                let stderr_tail = match child.stderr.take() {
                    Some(mut stderr) => {
                        let mut buf = String::new();
                        let _ = stderr.read_to_string(&mut buf).await;
                        tail(&buf)
                    }
                    None => String::new(),
                };
                let status = child.wait().await.map_err(SandboxError::Wait)?;
                let mut detail = match status.code() {
                    Some(code) => format!(" (exit code {})", code),
                    None => " (killed by signal)".to_string(),
                };
                if !stderr_tail.is_empty() {
                    detail.push_str(": ");
                    detail.push_str(&stderr_tail);
                }
                Err(SandboxError::NoReport { detail })
            }
            Err(_) => {
                let _ = child.kill().await;
                debug!(candidate = %id, "sandbox watchdog fired");
                Err(SandboxError::TimedOut {
                    secs: self.config.timeout_secs,
                })
            }
        }
    }

    /// The channel is one-way and best-effort; a dropped receiver only means
    /// nobody is watching anymore.
    fn emit(&self, message: StatusMessage) {
        if self.status_tx.send(message).is_err() {
            debug!("status receiver dropped; report discarded");
        }
    }
}

/// Read child stdout until the first terminal status tagged with our own
/// candidate id. Lines that do not parse as status messages, carry a foreign
/// id, or report a non-terminal status are skipped. Returns `None` on EOF.
async fn read_terminal_status(
    stdout: tokio::process::ChildStdout,
    id: CandidateId,
) -> Option<StatusMessage> {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(message) = serde_json::from_str::<StatusMessage>(line.trim()) else {
            continue;
        };
        if !message.is_status() || message.candidate_id != id {
            continue;
        }
        if message.status.is_terminal() {
            return Some(message);
        }
    }
    None
}

/// Last few lines of captured stderr, flattened for an error message.
fn tail(text: &str) -> String {
    const MAX_LINES: usize = 4;
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(MAX_LINES);
    lines[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SandboxStatus;

    fn sh_config() -> SandboxConfig {
        SandboxConfig {
            runtime: "sh".to_string(),
            runtime_args: Vec::new(),
            settle_ms: 0,
            timeout_secs: 5,
            frame_budget: 3,
        }
    }

    fn channel() -> (
        mpsc::UnboundedSender<StatusMessage>,
        mpsc::UnboundedReceiver<StatusMessage>,
    ) {
        mpsc::unbounded_channel()
    }

    async fn execute_script(
        config: SandboxConfig,
        id: CandidateId,
        script: &str,
    ) -> (Result<StatusMessage, SandboxError>, Vec<StatusMessage>) {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("fake.sh");
        std::fs::write(&program, script).unwrap();

        let (tx, mut rx) = channel();
        let harness = SandboxHarness::new(config, tx);
        let result = harness.execute(id, &program, dir.path()).await;

        let mut emitted = Vec::new();
        while let Ok(message) = rx.try_recv() {
            emitted.push(message);
        }
        (result, emitted)
    }

    #[tokio::test]
    async fn terminal_success_line_is_recognized() {
        let script = r#"echo '{"kind":"status","candidateId":7,"status":"success"}'"#;
        let (result, _) = execute_script(sh_config(), CandidateId(7), script).await;
        let terminal = result.unwrap();
        assert_eq!(terminal.status, SandboxStatus::Success);
        assert_eq!(terminal.candidate_id, CandidateId(7));
    }

    #[tokio::test]
    async fn terminal_error_line_carries_message() {
        let script = r#"echo '{"kind":"status","candidateId":3,"status":"error","message":"ReferenceError: blob is not defined"}'"#;
        let (result, _) = execute_script(sh_config(), CandidateId(3), script).await;
        let terminal = result.unwrap();
        assert_eq!(terminal.status, SandboxStatus::Error);
        assert!(terminal.message.unwrap().contains("ReferenceError"));
    }

    #[tokio::test]
    async fn noise_lines_before_the_status_are_skipped() {
        let script = concat!(
            "echo 'sketch chatter'\n",
            "echo '{not json'\n",
            r#"echo '{"kind":"status","candidateId":1,"status":"success"}'"#,
            "\n",
        );
        let (result, _) = execute_script(sh_config(), CandidateId(1), script).await;
        assert_eq!(result.unwrap().status, SandboxStatus::Success);
    }

    #[tokio::test]
    async fn foreign_candidate_id_is_not_ours() {
        // A status tagged with another id must not decide this run.
        let script = r#"echo '{"kind":"status","candidateId":999,"status":"success"}'"#;
        let (result, _) = execute_script(sh_config(), CandidateId(1), script).await;
        let err = result.unwrap_err();
        assert!(matches!(err, SandboxError::NoReport { .. }));
    }

    #[tokio::test]
    async fn silent_exit_reports_exit_code_and_stderr() {
        let script = "echo 'SyntaxError: unexpected token' >&2\nexit 3\n";
        let (result, _) = execute_script(sh_config(), CandidateId(1), script).await;
        let err = result.unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("exit code 3"));
        assert!(rendered.contains("SyntaxError"));
    }

    #[tokio::test]
    async fn watchdog_kills_a_hung_runtime() {
        let mut config = sh_config();
        config.timeout_secs = 1;
        let script = "sleep 10\n";
        let (result, _) = execute_script(config, CandidateId(1), script).await;
        assert!(matches!(result.unwrap_err(), SandboxError::TimedOut { secs: 1 }));
    }

    #[tokio::test]
    async fn run_emits_loading_then_exactly_one_terminal() {
        // `sh` cannot evaluate the composed JavaScript document, so the run
        // ends in `error`, which is exactly the lifecycle shape to check.
        let (tx, mut rx) = channel();
        let harness = SandboxHarness::new(sh_config(), tx);
        let candidate = Candidate::new(CandidateId(5), "raw", "circle(1, 2, 3);");

        let terminal = harness.run(&candidate, &[]).await;
        assert_eq!(terminal.status, SandboxStatus::Error);

        let mut emitted = Vec::new();
        while let Ok(message) = rx.try_recv() {
            emitted.push(message);
        }
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].status, SandboxStatus::Loading);
        assert_eq!(emitted[0].candidate_id, CandidateId(5));
        assert!(emitted[1].status.is_terminal());
        assert_eq!(emitted[1].candidate_id, CandidateId(5));
    }

    #[tokio::test]
    async fn missing_runtime_folds_into_error_status() {
        let config = SandboxConfig {
            runtime: "easel-test-runtime-that-does-not-exist".to_string(),
            ..sh_config()
        };
        let (tx, mut rx) = channel();
        let harness = SandboxHarness::new(config, tx);
        let candidate = Candidate::new(CandidateId(2), "raw", "circle(1, 2, 3);");

        let terminal = harness.run(&candidate, &[]).await;
        assert_eq!(terminal.status, SandboxStatus::Error);
        assert!(terminal.message.unwrap().contains("spawn"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.status, SandboxStatus::Loading);
    }

    #[tokio::test]
    async fn addon_load_failure_is_contained() {
        let (tx, _rx) = channel();
        let harness = SandboxHarness::new(sh_config(), tx);
        let candidate = Candidate::new(CandidateId(4), "raw", "circle(1, 2, 3);");
        let addon = LibraryAddon::new("ghost", "Ghost", "/nonexistent/ghost.js");

        let terminal = harness.run(&candidate, std::slice::from_ref(&addon)).await;
        assert_eq!(terminal.status, SandboxStatus::Error);
        assert!(terminal.message.unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_break_the_run() {
        let (tx, rx) = channel();
        drop(rx);
        let harness = SandboxHarness::new(sh_config(), tx);
        let candidate = Candidate::new(CandidateId(6), "raw", "circle(1, 2, 3);");

        let terminal = harness.run(&candidate, &[]).await;
        assert!(terminal.status.is_terminal());
    }

    #[test]
    fn tail_keeps_last_lines_only() {
        let text = "one\ntwo\nthree\nfour\nfive\nsix\n";
        let t = tail(text);
        assert!(t.contains("six"));
        assert!(!t.contains("one"));
    }
}
