use std::path::Path;

use anyhow::{Context, Result};
use notion_ics_core::config::Config;
use notion_ics_core::source::{bundle_from_pages, page_property_ids, pages_from_json, schema_property_ids};

use super::{OutputArgs, read_input, write_calendar};

pub fn run(
    cfg: &Config,
    input: &str,
    schema: Option<&Path>,
    name: Option<String>,
    output: &OutputArgs,
) -> Result<()> {
    let (pages, dropped) = pages_from_json(&read_input(input)?)?;

    // Property names are resolved to IDs once, up front.
    let ids = match schema {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read schema {}", path.display()))?;
            let schema: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse schema {}", path.display()))?;
            schema_property_ids(&schema)?
        }
        None => page_property_ids(&pages),
    };
    // No pages and no schema: nothing to resolve against, and nothing to read.
    let properties = if ids.is_empty() && pages.is_empty() {
        cfg.properties.clone()
    } else {
        cfg.properties
            .resolve(&ids)
            .context("Check the [properties] section of your config")?
    };

    let name = name.unwrap_or_else(|| cfg.calendar_name.clone());
    let (bundle, skipped) = bundle_from_pages(&name, &pages, &properties);

    let conversion = write_calendar(&bundle, cfg, output)?;

    let total_skipped = dropped.len() + skipped.len() + conversion.skipped();
    if total_skipped > 0 {
        tracing::info!("{total_skipped} of {} pages were not converted", pages.len() + dropped.len());
    }

    Ok(())
}
