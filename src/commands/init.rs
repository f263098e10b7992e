use std::path::Path;

use anyhow::Result;
use notion_ics_core::config::Config;

pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}\n\
            Use --force to overwrite it.",
            path.display()
        );
    }

    Config::create_default_config(path)?;
    println!("Created {}", path.display());

    Ok(())
}
