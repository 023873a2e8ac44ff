//! Long-running video generation command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use easel::client::{GeminiClient, GenerationRequest};
use easel::config::{self, EaselConfig};
use easel::poller::OperationPoller;

pub async fn cmd_video(project_dir: &Path, prompt: &str, output: Option<&Path>) -> Result<()> {
    let config = EaselConfig::load(project_dir)?;
    let api_key = config::resolve_api_key()?;

    let client = GeminiClient::new(api_key)
        .with_base_url(config.api.base_url.clone())
        .with_video_model(config.api.video_model.clone());

    let mut request = GenerationRequest::from_prompt(prompt);
    request.sampling = config.generation.sampling;

    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message("Waiting for video job (this can take a few minutes)...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let poller = OperationPoller::new(Arc::new(client))
        .with_interval(Duration::from_millis(config.poll_interval_ms));
    let result = poller.generate_video(&request).await;
    spinner.finish_and_clear();

    let bytes = result.context("Video generation failed")?;
    let out = match output {
        Some(path) => path.to_path_buf(),
        None => default_output(),
    };
    std::fs::write(&out, &bytes)
        .with_context(|| format!("Failed to write video to {}", out.display()))?;
    println!(
        "{} {} ({} bytes)",
        style("Saved").green().bold(),
        out.display(),
        bytes.len()
    );
    Ok(())
}

fn default_output() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("easel-video-{}.mp4", stamp))
}
