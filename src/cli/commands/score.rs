//! `pressroom score`: deterministic SEO scoring of existing content.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;

use crate::cli::render;
use crate::services::seo_scorer::{SeoInputs, SeoScorer};

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Markdown file to score
    pub file: PathBuf,

    /// Title to score against; defaults to the first `#` heading
    #[arg(long)]
    pub title: Option<String>,

    /// Focus keywords, comma separated
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Meta description to check against the length window
    #[arg(long)]
    pub meta_description: Option<String>,

    /// Tags, comma separated
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

pub async fn execute(args: ScoreArgs, config_path: Option<&Path>, json_mode: bool) -> Result<i32> {
    let config = super::load_config(config_path)?;
    let body = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let title = args
        .title
        .or_else(|| first_heading(&body))
        .unwrap_or_else(|| {
            args.file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    let scorer = SeoScorer::new(config.content);
    let report = scorer.score(&SeoInputs {
        title: &title,
        body: &body,
        meta_description: args.meta_description.as_deref(),
        tags: &args.tags,
        keywords: &args.keywords,
    });

    render::seo_report(&title, &report, json_mode)?;
    Ok(0)
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|l| l.starts_with("# "))
        .map(|l| l.trim_start_matches("# ").to_string())
}
