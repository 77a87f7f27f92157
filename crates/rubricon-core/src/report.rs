//! Grading report types with JSON persistence.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fusion::FusionResult;
use crate::router::Modality;

/// A complete grading run over one batch of question blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Name of the oracle used for the text path.
    pub oracle: String,
    /// Per-question outcomes, in input order.
    pub outcomes: Vec<QuestionOutcome>,
    /// Aggregate counts for the batch.
    pub summary: ReportSummary,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// One question's graded outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    #[serde(flatten)]
    pub result: FusionResult,
    /// Narrative feedback with the per-criterion header prepended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Batch-level aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub question_count: usize,
    pub needs_review_count: usize,
    /// Mean of final totals, rounded to two decimals. Zero for an empty batch.
    pub mean_total: f64,
    /// Question counts per scoring path ("math", "code", "text").
    pub per_kind: HashMap<String, usize>,
}

impl GradingReport {
    pub fn new(oracle: &str, outcomes: Vec<QuestionOutcome>, duration_ms: u64) -> Self {
        let summary = ReportSummary::from_outcomes(&outcomes);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            oracle: oracle.to_string(),
            outcomes,
            summary,
            duration_ms,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: GradingReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

impl ReportSummary {
    pub fn from_outcomes(outcomes: &[QuestionOutcome]) -> Self {
        let mut per_kind: HashMap<String, usize> = HashMap::new();
        let mut needs_review_count = 0;
        let mut total_sum = 0.0;
        for o in outcomes {
            *per_kind.entry(kind_label(o.result.kind).to_string()).or_insert(0) += 1;
            if o.result.needs_review {
                needs_review_count += 1;
            }
            total_sum += o.result.final_grade.total;
        }
        let mean_total = if outcomes.is_empty() {
            0.0
        } else {
            (total_sum / outcomes.len() as f64 * 100.0).round() / 100.0
        };
        Self {
            question_count: outcomes.len(),
            needs_review_count,
            mean_total,
            per_kind,
        }
    }
}

fn kind_label(kind: Modality) -> &'static str {
    match kind {
        Modality::Math => "math",
        Modality::Code => "code",
        Modality::Text => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::FinalGrade;
    use crate::rubric::Breakdown;

    fn outcome(id: &str, total: f64, kind: Modality, needs_review: bool) -> QuestionOutcome {
        QuestionOutcome {
            question_id: id.to_string(),
            result: FusionResult {
                final_grade: FinalGrade {
                    total,
                    per_criterion: Breakdown::default(),
                },
                disagreement: 0.0,
                needs_review,
                kind,
                debug: None,
            },
            feedback: None,
        }
    }

    #[test]
    fn summary_counts() {
        let outcomes = vec![
            outcome("q1", 8.0, Modality::Math, false),
            outcome("q2", 5.0, Modality::Text, true),
            outcome("q3", 2.0, Modality::Text, false),
        ];
        let summary = ReportSummary::from_outcomes(&outcomes);
        assert_eq!(summary.question_count, 3);
        assert_eq!(summary.needs_review_count, 1);
        assert_eq!(summary.mean_total, 5.0);
        assert_eq!(summary.per_kind["text"], 2);
        assert_eq!(summary.per_kind["math"], 1);
    }

    #[test]
    fn empty_batch_summary() {
        let summary = ReportSummary::from_outcomes(&[]);
        assert_eq!(summary.question_count, 0);
        assert_eq!(summary.mean_total, 0.0);
    }

    #[test]
    fn json_roundtrip() {
        let report = GradingReport::new(
            "mock",
            vec![outcome("q1", 7.5, Modality::Code, false)],
            42,
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        report.save_json(&path).unwrap();
        let loaded = GradingReport::load_json(&path).unwrap();

        assert_eq!(loaded.oracle, "mock");
        assert_eq!(loaded.outcomes.len(), 1);
        assert_eq!(loaded.outcomes[0].question_id, "q1");
        assert_eq!(loaded.summary.question_count, 1);
    }

    #[test]
    fn outcome_serializes_flattened() {
        let json = serde_json::to_value(outcome("q1", 3.0, Modality::Text, true)).unwrap();
        assert_eq!(json["question_id"], "q1");
        assert_eq!(json["final"]["total"], 3.0);
        assert_eq!(json["needs_review"], true);
    }
}
