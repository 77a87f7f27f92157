//! The `rubricon run` command.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use rubricon_core::engine::GradingEngine;
use rubricon_core::model::QuestionBlock;
use rubricon_core::report::GradingReport;
use rubricon_core::retrieval::{DocKind, ExemplarStore, NoRetrieval};
use rubricon_core::traits::RetrievalIndex;
use rubricon_math::SymbolicScorer;
use rubricon_oracle::config::{create_oracle, load_config_from, OracleConfig};
use rubricon_runner::SandboxScorer;

/// One entry in a `--context` file.
#[derive(Debug, Deserialize)]
struct ContextDoc {
    text: String,
    /// "rubric", "ideal", or "exemplar".
    kind: String,
    #[serde(default)]
    question_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

pub async fn execute(
    input: PathBuf,
    context: Option<PathBuf>,
    parallelism: Option<usize>,
    output: Option<PathBuf>,
    model: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;

    if let Some(name) = model {
        let OracleConfig::Ollama { model, .. } = &mut config.oracle;
        *model = name;
    }
    let parallelism = parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
    let output = output.unwrap_or_else(|| config.output_dir.clone());

    let blocks = load_blocks(&input)?;
    let retrieval = build_retrieval(context.as_deref())?;

    let oracle = create_oracle(&config.oracle);
    let oracle_name = oracle.name().to_string();
    let engine = GradingEngine::new(
        oracle,
        Arc::new(SymbolicScorer::from_config(&config.grading)),
        Arc::new(SandboxScorer::from_config(&config.grading)),
        retrieval,
        config.grading.clone(),
    );

    eprintln!(
        "rubricon v0.1.0 — Grading {} question blocks ({}, parallelism {})",
        blocks.len(),
        oracle_name,
        parallelism
    );
    eprintln!();

    let report = engine.grade_batch(&blocks, parallelism).await;

    print_summary(&report);

    std::fs::create_dir_all(&output)
        .with_context(|| format!("failed to create output dir {}", output.display()))?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Report saved to: {}", path.display());

    Ok(())
}

fn load_blocks(path: &std::path::Path) -> Result<Vec<QuestionBlock>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question blocks from {}", path.display()))?;
    let blocks: Vec<QuestionBlock> =
        serde_json::from_str(&content).context("failed to parse question blocks JSON")?;
    anyhow::ensure!(!blocks.is_empty(), "no question blocks in {}", path.display());
    Ok(blocks)
}

fn build_retrieval(context: Option<&std::path::Path>) -> Result<Arc<dyn RetrievalIndex>> {
    let Some(path) = context else {
        return Ok(Arc::new(NoRetrieval));
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read context from {}", path.display()))?;
    let docs: Vec<ContextDoc> =
        serde_json::from_str(&content).context("failed to parse context JSON")?;

    let mut store = ExemplarStore::new();
    for doc in docs {
        let kind = match doc.kind.as_str() {
            "rubric" => DocKind::Rubric,
            "ideal" => DocKind::Ideal,
            "exemplar" => DocKind::Exemplar,
            other => anyhow::bail!(
                "unknown context kind '{other}' (expected rubric, ideal, or exemplar)"
            ),
        };
        store.add(doc.text, kind, doc.question_id.as_deref(), doc.metadata);
    }
    Ok(Arc::new(store))
}

fn print_summary(report: &GradingReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Question", "Kind", "Score", "Disagreement", "Review"]);

    for outcome in &report.outcomes {
        let review = if outcome.result.needs_review {
            "NEEDS REVIEW"
        } else {
            ""
        };
        table.add_row(vec![
            Cell::new(&outcome.question_id),
            Cell::new(outcome.result.kind.to_string()),
            Cell::new(format!("{:.2}", outcome.result.final_grade.total)),
            Cell::new(format!("{:.2}", outcome.result.disagreement)),
            Cell::new(review),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!(
        "\n{} questions graded, mean score {:.2}, {} flagged for review ({:.1}s)",
        report.summary.question_count,
        report.summary.mean_total,
        report.summary.needs_review_count,
        report.duration_ms as f64 / 1000.0
    );
}
