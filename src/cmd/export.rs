//! Export a sketch as a self-contained runnable HTML bundle.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use easel::addons::select_addons;
use easel::candidate::{Candidate, CandidateId};
use easel::config::EaselConfig;
use easel::export::write_bundle;

pub fn cmd_export(
    project_dir: &Path,
    source: &Path,
    addon_ids: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let config = EaselConfig::load(project_dir)?;
    let catalog = config.addon_catalog();
    let selection = select_addons(&catalog, addon_ids)?;

    let text = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read sketch {}", source.display()))?;
    let candidate = Candidate::new(CandidateId(1), text.clone(), text);

    let out = match output {
        Some(path) => path.to_path_buf(),
        None => source.with_extension("html"),
    };
    let path = write_bundle(&candidate, &selection, &out)?;
    println!(
        "{} {} ({} addon{})",
        style("Exported").green().bold(),
        path.display(),
        selection.len(),
        if selection.len() == 1 { "" } else { "s" }
    );
    Ok(())
}
