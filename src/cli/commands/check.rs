//! `pressroom check`: fact-check a markdown file, or validate configuration
//! and show the gate plan when no file is given.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;

use crate::cli::render;
use crate::domain::models::Config;
use crate::infrastructure::OpenAiClient;
use crate::services::{FactChecker, RetryPolicy};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Markdown file to fact-check; omit to validate the configuration
    pub file: Option<PathBuf>,
}

pub async fn execute(args: CheckArgs, config_path: Option<&Path>, json_mode: bool) -> Result<i32> {
    let config = super::load_config(config_path)?;

    match args.file {
        Some(file) => check_file(&file, &config, json_mode).await,
        None => check_config(&config, json_mode),
    }
}

/// Run claim extraction and validation over a local file.
async fn check_file(file: &Path, config: &Config, json_mode: bool) -> Result<i32> {
    let body = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let generation = Arc::new(OpenAiClient::new(&config.generation)?);
    let checker = FactChecker::new(
        generation,
        RetryPolicy::from_config(&config.retry),
        config.pipeline.confidence_threshold,
    );

    let outcome = checker.check(&body).await;
    render::validation_report(&outcome.report, &outcome.warnings, json_mode)?;
    Ok(0)
}

fn check_config(config: &Config, json_mode: bool) -> Result<i32> {
    if json_mode {
        // Secrets stay out of the dump.
        let mut redacted = config.clone();
        redacted.generation.api_key = "<redacted>".to_string();
        redacted.publisher.api_key = "<redacted>".to_string();
        println!("{}", serde_json::to_string_pretty(&redacted)?);
        return Ok(0);
    }

    println!("{} configuration is valid", style("ok:").green().bold());
    println!("  model: {}", config.generation.model);
    println!("  publication: {}", config.publisher.publication);
    println!("  output dir: {}", config.pipeline.output_dir);
    println!(
        "  daily budget: {} post(s), feedback budget: {} iteration(s) per gate",
        config.pipeline.max_posts_per_day, config.pipeline.max_feedback_iterations
    );
    println!();
    render::gate_plan(&config.gates);
    Ok(0)
}
