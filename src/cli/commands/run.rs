//! `pressroom run`: execute the full pipeline for a topic request.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Args;
use serde_json::{Map, Value};
use tracing::info;

use crate::cli::render;
use crate::domain::error::PipelineError;
use crate::domain::models::{
    PublicationRecord, QuarantineRecord, RunStatus, TopicRequest,
};
use crate::infrastructure::{ArtifactStore, HttpPublisher, OpenAiClient};
use crate::services::PipelineOrchestrator;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Topics to research, strongest preference first
    #[arg(required = true)]
    pub topics: Vec<String>,

    /// Constraint in KEY=VALUE form (e.g. tone=conversational)
    #[arg(long = "constraint", value_name = "KEY=VALUE")]
    pub constraints: Vec<String>,
}

pub async fn execute(args: RunArgs, config_path: Option<&Path>, json_mode: bool) -> Result<i32> {
    let config = super::load_config(config_path)?;
    let store = ArtifactStore::new(&config.pipeline.output_dir);

    // Daily budget is enforced before anything is generated.
    let published = store.published_on(Utc::now())?;
    if published >= config.pipeline.max_posts_per_day {
        return Err(PipelineError::PostBudgetExhausted {
            max: config.pipeline.max_posts_per_day,
        }
        .into());
    }

    let generation = Arc::new(OpenAiClient::new(&config.generation)?);
    let publisher = Arc::new(HttpPublisher::new(&config.publisher)?);
    let orchestrator = PipelineOrchestrator::new(&config, generation, publisher);

    let request = TopicRequest {
        topics: args.topics,
        constraints: parse_constraints(&args.constraints)?,
    };
    let report = orchestrator.run(request).await?;

    match report.status {
        RunStatus::Complete => {
            let title = report
                .context
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            store.save_publication(&PublicationRecord {
                workflow_id: report.context.workflow_id,
                title,
                published_url: report.published_url.clone(),
                published_at: report.finished_at,
            })?;
        }
        RunStatus::Quarantined => {
            let reason = report
                .context
                .errors
                .last()
                .map_or_else(|| "quality gates failed".to_string(), |e| e.message.clone());
            let path = store.save_quarantine(&QuarantineRecord {
                workflow_id: report.context.workflow_id,
                reason,
                quarantined_at: report.finished_at,
                context: report.context.clone(),
            })?;
            info!(path = %path.display(), "run held for review");
        }
    }

    render::run_report(&report, json_mode)?;
    Ok(report.status.exit_code())
}

fn parse_constraints(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut constraints = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid constraint '{pair}', expected KEY=VALUE"))?;
        constraints.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
    }
    Ok(constraints)
}
