mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notion_ics_core::config::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notion-ics")]
#[command(about = "Turn Notion calendar records into an .ics file")]
struct Cli {
    /// Config file (defaults to ~/.config/notion-ics/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every emitted event
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a calendar bundle ({"name", "events": [...]}) to .ics
    Convert {
        /// Bundle JSON file, or "-" for stdin
        input: String,

        #[command(flatten)]
        output: commands::OutputArgs,
    },
    /// Convert a Notion data-source query result to .ics
    Pages {
        /// Query result JSON file, or "-" for stdin
        input: String,

        /// Data-source schema JSON, used to resolve property names to IDs
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Calendar name (defaults to calendar_name from config)
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        output: commands::OutputArgs,
    },
    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init { force } => {
            let path = match cli.config {
                Some(path) => path,
                None => Config::config_path()?,
            };
            commands::init::run(&path, force)
        }
        Commands::Convert { input, output } => {
            let cfg = load_config(cli.config.as_deref())?;
            commands::convert::run(&cfg, &input, &output)
        }
        Commands::Pages {
            input,
            schema,
            name,
            output,
        } => {
            let cfg = load_config(cli.config.as_deref())?;
            commands::pages::run(&cfg, &input, schema.as_deref(), name, &output)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    Config::load(path).context("Failed to load configuration")
}

/// Logs go to stderr so the calendar can go to stdout.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
