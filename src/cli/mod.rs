//! CLI surface: argument parsing, command dispatch, terminal rendering.

pub mod commands;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

#[derive(Parser, Debug)]
#[command(name = "pressroom", version, about = "Automated content pipeline with staged generation, quality gates, and fact-checked publishing")]
pub struct Cli {
    /// Emit machine-readable JSON instead of formatted output
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from a specific file instead of pressroom.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the synthesis pipeline for a topic request
    Run(commands::run::RunArgs),
    /// Fact-check a markdown file, or validate the configuration and show
    /// the gate plan when no file is given
    Check(commands::check::CheckArgs),
    /// Score existing content against the SEO criteria, without generation
    Score(commands::score::ScoreArgs),
}

/// Print a top-level error and exit with status 1.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let payload = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{payload}");
    } else {
        eprintln!("{} {err:#}", style("error:").red().bold());
    }
    std::process::exit(1)
}
