//! Sandboxed render command.
//!
//! Each source file becomes one candidate; every candidate runs in its own
//! sandbox concurrently. The command listens on the status channel and
//! applies each message to the host-owned status table, printing per-
//! candidate state as it changes. One crashing candidate never affects
//! another; a failed run is an inline error scoped to that candidate only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use console::style;
use tokio::sync::mpsc;

use easel::addons::{LibraryAddon, select_addons};
use easel::candidate::{Candidate, CandidateId, IdGenerator, RunStatus};
use easel::config::EaselConfig;
use easel::sandbox::SandboxHarness;
use easel::status::StatusTable;

pub async fn cmd_render(
    project_dir: &Path,
    sources: &[PathBuf],
    addon_ids: &[String],
) -> Result<()> {
    if sources.is_empty() {
        bail!("No sketch sources given");
    }

    let config = EaselConfig::load(project_dir)?;
    let catalog = config.addon_catalog();
    let selection = select_addons(&catalog, addon_ids)?;

    let ids = IdGenerator::new();
    let mut labels: HashMap<CandidateId, String> = HashMap::new();
    let mut candidates = Vec::with_capacity(sources.len());
    for path in sources {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sketch {}", path.display()))?;
        let candidate = Candidate::new(ids.next_id(), source.clone(), source);
        labels.insert(candidate.id, path.display().to_string());
        candidates.push(candidate);
    }

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let mut table = StatusTable::new();
    for candidate in &candidates {
        table.register(candidate.id);
    }

    let mut tasks = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let harness = SandboxHarness::new(config.sandbox.clone(), status_tx.clone());
        let selection: Vec<LibraryAddon> = selection.clone();
        tasks.push(tokio::spawn(async move {
            harness.run(&candidate, &selection).await
        }));
    }
    // Once every harness finished and dropped its sender, the channel closes
    // and the loop below drains out.
    drop(status_tx);

    while let Some(message) = status_rx.recv().await {
        let id = message.candidate_id;
        if !table.apply(&message) {
            continue;
        }
        let label = labels
            .get(&id)
            .map(String::as_str)
            .unwrap_or("unknown source");
        if let Some(state) = table.get(id) {
            print_state(id, label, state.status, state.message.as_deref());
        }
    }

    for task in tasks {
        let _ = task.await;
    }

    println!();
    if table.all_terminal() {
        println!("All candidates finished.");
    }
    Ok(())
}

fn print_state(id: CandidateId, label: &str, status: RunStatus, message: Option<&str>) {
    match status {
        RunStatus::Loading => {
            println!("  {} {} {}", style(id.to_string()).cyan(), label, style("loading").dim());
        }
        RunStatus::Success => {
            println!(
                "  {} {} {}",
                style(id.to_string()).cyan(),
                label,
                style("success").green()
            );
        }
        RunStatus::Error => {
            println!(
                "  {} {} {} {}",
                style(id.to_string()).cyan(),
                label,
                style("error").red(),
                style(message.unwrap_or("unknown error")).dim()
            );
        }
        RunStatus::Idle => {}
    }
}
