pub mod convert;
pub mod init;
pub mod pages;

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use notion_ics_core::config::Config;
use notion_ics_core::{CalendarBundle, Conversion, SerializeOptions};
use tracing::info;

/// Output flags shared by the converting commands.
#[derive(Args)]
pub struct OutputArgs {
    /// Write to this file instead of stdout (overrides `output` from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write text fields unescaped and lines unfolded
    #[arg(long)]
    pub raw: bool,
}

impl OutputArgs {
    pub fn options(&self, cfg: &Config) -> SerializeOptions {
        let options = cfg.serialize_options();
        if self.raw {
            SerializeOptions {
                escape_text: false,
                fold_lines: false,
                ..options
            }
        } else {
            options
        }
    }

    fn path(&self, cfg: &Config) -> Option<PathBuf> {
        self.output.clone().or_else(|| cfg.output_path())
    }
}

/// Read a file, or stdin for "-".
pub fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }

    std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
}

/// Serialize the bundle and write it where the flags/config say.
pub fn write_calendar(bundle: &CalendarBundle, cfg: &Config, args: &OutputArgs) -> Result<Conversion> {
    let conversion = notion_ics_core::serialize(bundle, &args.options(cfg))?;

    match args.path(cfg) {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, &conversion.ics)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(calendar = %bundle.name, "Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(conversion.ics.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(conversion)
}
