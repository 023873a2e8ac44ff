//! Static catalog of optional library addons injectable into a sandbox.
//!
//! Addons are purely additive: the user toggles a subset per render, and the
//! selected sources are injected into the execution document in selection
//! order before the candidate's program runs. A resource locator is either an
//! `http(s)` URL or a local filesystem path.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::errors::SandboxError;

/// One entry of the addon catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryAddon {
    pub id: String,
    pub display_name: String,
    pub resource_locator: String,
}

impl LibraryAddon {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        resource_locator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            resource_locator: resource_locator.into(),
        }
    }
}

/// The built-in catalog. Config may append further entries.
pub fn builtin_catalog() -> Vec<LibraryAddon> {
    vec![
        LibraryAddon::new(
            "p5.sound",
            "p5.sound",
            "https://cdnjs.cloudflare.com/ajax/libs/p5.js/1.9.4/addons/p5.sound.min.js",
        ),
        LibraryAddon::new(
            "ml5",
            "ml5.js",
            "https://unpkg.com/ml5@0.12.2/dist/ml5.min.js",
        ),
        LibraryAddon::new(
            "matter",
            "Matter.js",
            "https://cdnjs.cloudflare.com/ajax/libs/matter-js/0.19.0/matter.min.js",
        ),
        LibraryAddon::new(
            "tone",
            "Tone.js",
            "https://unpkg.com/tone@14.8.49/build/Tone.js",
        ),
    ]
}

/// Resolve a user selection against a catalog, preserving selection order.
pub fn select_addons(catalog: &[LibraryAddon], ids: &[String]) -> Result<Vec<LibraryAddon>> {
    let mut selected = Vec::with_capacity(ids.len());
    for id in ids {
        match catalog.iter().find(|addon| &addon.id == id) {
            Some(addon) => selected.push(addon.clone()),
            None => bail!(
                "Unknown addon '{}'. Run `easel addons` to list the catalog.",
                id
            ),
        }
    }
    Ok(selected)
}

/// Fetch the source text behind an addon's resource locator.
pub async fn resolve_source(
    addon: &LibraryAddon,
    http: &reqwest::Client,
) -> Result<String, SandboxError> {
    let locator = addon.resource_locator.as_str();
    if locator.starts_with("http://") || locator.starts_with("https://") {
        let response = http
            .get(locator)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SandboxError::AddonLoad {
                id: addon.id.clone(),
                message: e.to_string(),
            })?;
        response.text().await.map_err(|e| SandboxError::AddonLoad {
            id: addon.id.clone(),
            message: e.to_string(),
        })
    } else {
        tokio::fs::read_to_string(locator)
            .await
            .map_err(|e| SandboxError::AddonLoad {
                id: addon.id.clone(),
                message: e.to_string(),
            })
    }
}
