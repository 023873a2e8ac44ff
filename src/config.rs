//! Layered configuration for easel.
//!
//! Settings come from `.easel/easel.toml` under the project directory, with
//! sensible defaults when the file or any section is missing. The API key is
//! never stored in the file; it comes from the environment
//! (`EASEL_API_KEY`, falling back to `GEMINI_API_KEY`).
//!
//! ```toml
//! [api]
//! model = "gemini-2.5-flash"
//! video_model = "veo-2.0-generate-001"
//!
//! [generation]
//! fan_out = 3
//! temperature = 1.0
//! top_k = 64
//! top_p = 0.95
//!
//! [sandbox]
//! runtime = "node"
//! settle_ms = 600
//! timeout_secs = 30
//! frame_budget = 60
//!
//! [poll]
//! interval_ms = 2000
//!
//! [[addons]]
//! id = "confetti"
//! display_name = "Confetti"
//! resource_locator = "https://cdn.example/confetti.js"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::addons::LibraryAddon;
use crate::client::{SamplingConfig, gemini};
use crate::errors::GenerationError;
use crate::sandbox::SandboxConfig;

/// Generation service endpoints and models.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub model: String,
    pub video_model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: gemini::DEFAULT_BASE_URL.to_string(),
            model: gemini::DEFAULT_MODEL.to_string(),
            video_model: gemini::DEFAULT_VIDEO_MODEL.to_string(),
        }
    }
}

/// Batch defaults applied when the CLI does not override them.
#[derive(Debug, Clone)]
pub struct GenerationDefaults {
    pub fan_out: usize,
    pub sampling: SamplingConfig,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            fan_out: crate::client::DEFAULT_FAN_OUT,
            sampling: SamplingConfig::default(),
        }
    }
}

/// The assembled configuration.
#[derive(Debug, Clone)]
pub struct EaselConfig {
    pub api: ApiConfig,
    pub generation: GenerationDefaults,
    pub sandbox: SandboxConfig,
    pub poll_interval_ms: u64,
    pub extra_addons: Vec<LibraryAddon>,
}

impl Default for EaselConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            generation: GenerationDefaults::default(),
            sandbox: SandboxConfig::default(),
            poll_interval_ms: 2000,
            extra_addons: Vec::new(),
        }
    }
}

/// Raw TOML structure for `.easel/easel.toml`.
#[derive(Debug, Deserialize)]
struct EaselToml {
    api: Option<ApiSection>,
    generation: Option<GenerationSection>,
    sandbox: Option<SandboxSection>,
    poll: Option<PollSection>,
    #[serde(default)]
    addons: Vec<AddonSection>,
}

#[derive(Debug, Deserialize)]
struct ApiSection {
    base_url: Option<String>,
    model: Option<String>,
    video_model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationSection {
    fan_out: Option<usize>,
    temperature: Option<f32>,
    top_k: Option<u32>,
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct SandboxSection {
    runtime: Option<String>,
    runtime_args: Option<Vec<String>>,
    settle_ms: Option<u64>,
    timeout_secs: Option<u64>,
    frame_budget: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PollSection {
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AddonSection {
    id: String,
    display_name: String,
    resource_locator: String,
}

impl EaselConfig {
    /// Load configuration from `.easel/easel.toml` in the project directory.
    /// Returns defaults if the file doesn't exist.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(".easel").join("easel.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let toml: EaselToml = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let mut config = Self::default();
        if let Some(api) = toml.api {
            if let Some(base_url) = api.base_url {
                config.api.base_url = base_url;
            }
            if let Some(model) = api.model {
                config.api.model = model;
            }
            if let Some(video_model) = api.video_model {
                config.api.video_model = video_model;
            }
        }
        if let Some(generation) = toml.generation {
            if let Some(fan_out) = generation.fan_out {
                config.generation.fan_out = fan_out;
            }
            if let Some(temperature) = generation.temperature {
                config.generation.sampling.temperature = temperature;
            }
            if let Some(top_k) = generation.top_k {
                config.generation.sampling.top_k = top_k;
            }
            if let Some(top_p) = generation.top_p {
                config.generation.sampling.top_p = top_p;
            }
        }
        if let Some(sandbox) = toml.sandbox {
            if let Some(runtime) = sandbox.runtime {
                config.sandbox.runtime = runtime;
            }
            if let Some(runtime_args) = sandbox.runtime_args {
                config.sandbox.runtime_args = runtime_args;
            }
            if let Some(settle_ms) = sandbox.settle_ms {
                config.sandbox.settle_ms = settle_ms;
            }
            if let Some(timeout_secs) = sandbox.timeout_secs {
                config.sandbox.timeout_secs = timeout_secs;
            }
            if let Some(frame_budget) = sandbox.frame_budget {
                config.sandbox.frame_budget = frame_budget;
            }
        }
        if let Some(poll) = toml.poll
            && let Some(interval_ms) = poll.interval_ms
        {
            config.poll_interval_ms = interval_ms;
        }
        config.extra_addons = toml
            .addons
            .into_iter()
            .map(|addon| LibraryAddon::new(addon.id, addon.display_name, addon.resource_locator))
            .collect();

        Ok(config)
    }

    /// The full addon catalog: built-ins plus configured extras.
    pub fn addon_catalog(&self) -> Vec<LibraryAddon> {
        let mut catalog = crate::addons::builtin_catalog();
        catalog.extend(self.extra_addons.iter().cloned());
        catalog
    }
}

/// Resolve the generation service credential from the environment.
pub fn resolve_api_key() -> Result<String, GenerationError> {
    std::env::var("EASEL_API_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(GenerationError::MissingApiKey)
}
