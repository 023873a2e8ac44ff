//! Batch sketch generation command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use easel::client::{GeminiClient, GenerationRequest, ReferenceImage};
use easel::config::{self, EaselConfig};
use easel::orchestrator::GenerationOrchestrator;

pub async fn cmd_generate(
    project_dir: &Path,
    prompt: &str,
    image: Option<&Path>,
    candidates: Option<usize>,
    out_dir: Option<&Path>,
) -> Result<()> {
    let config = EaselConfig::load(project_dir)?;
    let api_key = config::resolve_api_key()?;

    let client = GeminiClient::new(api_key)
        .with_base_url(config.api.base_url.clone())
        .with_model(config.api.model.clone());

    let mut request = GenerationRequest::from_prompt(prompt);
    request.sampling = config.generation.sampling;
    request.fan_out = candidates.unwrap_or(config.generation.fan_out);
    if let Some(path) = image {
        request.image = Some(load_reference_image(path)?);
    }

    let spinner = spinner(format!(
        "Generating {} candidate{}...",
        request.fan_out,
        if request.fan_out == 1 { "" } else { "s" }
    ));

    let orchestrator = GenerationOrchestrator::new(Arc::new(client));
    match orchestrator.generate_batch(&request).await {
        Ok(batch) => {
            spinner.finish_and_clear();
            let dir = match out_dir {
                Some(dir) => dir.to_path_buf(),
                None => default_out_dir(project_dir),
            };
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;

            println!(
                "{} {} candidates",
                style("Generated").green().bold(),
                batch.len()
            );
            for candidate in &batch {
                let path = dir.join(format!("{}.js", candidate.id));
                std::fs::write(&path, candidate.source_code())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!(
                    "  {} {} ({} lines)",
                    style(candidate.id.to_string()).cyan(),
                    path.display(),
                    candidate.source_code().lines().count()
                );
            }
            println!();
            println!("Preview with `easel render {}/*.js`.", dir.display());
            Ok(())
        }
        Err(err) => {
            spinner.finish_and_clear();
            // One error surface for the whole batch.
            eprintln!("{} {}", style("Batch failed:").red().bold(), err);
            eprintln!("  hint: {}", style(err.hint()).dim());
            Err(err.into())
        }
    }
}

fn load_reference_image(path: &Path) -> Result<ReferenceImage> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read reference image {}", path.display()))?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    Ok(ReferenceImage { data, mime_type })
}

fn default_out_dir(project_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    project_dir
        .join(".easel")
        .join("candidates")
        .join(stamp.to_string())
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(spinner_style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
