//! Terminal rendering for reports.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use console::style;

use crate::domain::models::{GateDefinition, RunReport, RunStatus, ThresholdMode, ValidationReport};
use crate::services::seo_scorer::{SeoGrade, SeoReport};

/// Print a run report: status, gate table, errors and warnings.
pub fn run_report(report: &RunReport, json_mode: bool) -> Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match report.status {
        RunStatus::Complete => {
            println!("{} run complete", style("published:").green().bold());
            if let Some(url) = &report.published_url {
                println!("  {url}");
            }
        }
        RunStatus::Quarantined => {
            println!(
                "{} run held for manual review, nothing was published",
                style("quarantined:").yellow().bold()
            );
        }
    }
    println!("  workflow: {}", report.context.workflow_id);
    println!();

    if !report.context.quality_gate_results.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Gate", "Result", "Score", "Failed criteria"]);
        let mut results: Vec<_> = report.context.quality_gate_results.values().collect();
        results.sort_by(|a, b| a.gate_name.cmp(&b.gate_name));
        for result in results {
            let verdict = if result.passed {
                style("pass").green().to_string()
            } else {
                style("fail").red().to_string()
            };
            table.add_row(vec![
                Cell::new(&result.gate_name),
                Cell::new(verdict),
                Cell::new(
                    result
                        .score
                        .map_or_else(|| "-".to_string(), |s| format!("{s:.2}")),
                ),
                Cell::new(result.failed_criteria.join(", ")),
            ]);
        }
        println!("{table}");
    }

    for warning in &report.context.warnings {
        println!("{} {warning}", style("warning:").yellow());
    }
    for error in &report.context.errors {
        let stage = error.stage.as_deref().unwrap_or("-");
        println!(
            "{} [{stage}/{}] {}",
            style("error:").red(),
            error.kind,
            error.message
        );
    }
    Ok(())
}

/// Print the effective gate plan from the configuration.
pub fn gate_plan(gates: &[GateDefinition]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Gate", "Producer", "Mode", "Criteria"]);
    for gate in gates {
        let mode = match gate.threshold {
            ThresholdMode::AllCriteria => "all criteria".to_string(),
            ThresholdMode::Fraction { threshold } => format!("fraction >= {threshold}"),
        };
        let criteria: Vec<&str> = gate.criteria.iter().map(|c| c.name()).collect();
        table.add_row(vec![
            Cell::new(&gate.name),
            Cell::new(&gate.producer),
            Cell::new(mode),
            Cell::new(criteria.join(", ")),
        ]);
    }
    println!("{table}");
}

/// Print a fact-check report: claim table, aggregates, degradations.
pub fn validation_report(
    report: &ValidationReport,
    warnings: &[String],
    json_mode: bool,
) -> Result<()> {
    if json_mode {
        let payload = serde_json::json!({ "report": report, "warnings": warnings });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if report.is_empty() {
        println!("{} no factual claims found", style("fact check:").bold());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Claim", "Kind", "Confidence", "SEO value", "Review"]);
    for claim in &report.claims {
        let review = if claim.needs_review {
            style("yes").red().to_string()
        } else {
            style("no").green().to_string()
        };
        table.add_row(vec![
            Cell::new(&claim.text),
            Cell::new(claim.kind.as_str()),
            Cell::new(format!("{:.2}", claim.confidence_score)),
            Cell::new(claim.seo_value.as_str()),
            Cell::new(review),
        ]);
    }
    println!("{table}");
    println!(
        "average confidence: {:.2}, flagged for review: {}",
        report.average_confidence, report.flagged_count
    );

    for warning in warnings {
        println!("{} {warning}", style("warning:").yellow());
    }
    Ok(())
}

/// Print an SEO report: sub-scores, composite, grade.
pub fn seo_report(title: &str, report: &SeoReport, json_mode: bool) -> Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{} {title}", style("scoring:").bold());
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Sub-score", "Value"]);
    let rows = [
        ("structure", report.sub_scores.structure),
        ("keywords", report.sub_scores.keywords),
        ("readability", report.sub_scores.readability),
        ("metadata", report.sub_scores.metadata),
        ("semantic", report.sub_scores.semantic),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(format!("{value:.1}"))]);
    }
    println!("{table}");

    let grade = match report.grade {
        SeoGrade::A | SeoGrade::B => style(report.grade.as_str()).green(),
        SeoGrade::C => style(report.grade.as_str()).yellow(),
        SeoGrade::D | SeoGrade::F => style(report.grade.as_str()).red(),
    };
    println!("overall: {:.1} (grade {grade})", report.overall);
    Ok(())
}
