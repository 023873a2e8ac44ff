//! List the library addon catalog.

use std::path::Path;

use anyhow::Result;
use console::style;

use easel::config::EaselConfig;

pub fn cmd_addons(project_dir: &Path) -> Result<()> {
    let config = EaselConfig::load(project_dir)?;
    let catalog = config.addon_catalog();

    println!("Available addons:");
    for addon in &catalog {
        println!(
            "  {:<12} {:<12} {}",
            style(&addon.id).cyan(),
            addon.display_name,
            style(&addon.resource_locator).dim()
        );
    }
    println!();
    println!("Select with `--addons id1,id2` on `easel render` or `easel export`.");
    Ok(())
}
