//! Multi-scorer fusion: consensus score, disagreement metric, and the
//! needs-review flag.
//!
//! Fusion is deliberately simple and fully deterministic: mean of totals,
//! population standard deviation as disagreement, and a review flag when
//! scorers diverge or any scorer is unsure of itself. The oracle may be
//! non-deterministic; the combination of its outputs is not.

use serde::{Deserialize, Serialize};

use crate::grade::UniformGrade;
use crate::router::Modality;
use crate::rubric::{distribute_proportionally, Breakdown, Rubric};

/// Disagreement above which a result is flagged for human review.
pub const DEFAULT_DISAGREEMENT_THRESHOLD: f64 = 2.0;

/// Per-scorer uncertainty above which a result is flagged for review.
pub const DEFAULT_UNCERTAINTY_THRESHOLD: f64 = 0.5;

/// Review thresholds, overridable via configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReviewThresholds {
    #[serde(default = "default_disagreement")]
    pub disagreement: f64,
    #[serde(default = "default_uncertainty")]
    pub uncertainty: f64,
}

fn default_disagreement() -> f64 {
    DEFAULT_DISAGREEMENT_THRESHOLD
}

fn default_uncertainty() -> f64 {
    DEFAULT_UNCERTAINTY_THRESHOLD
}

impl Default for ReviewThresholds {
    fn default() -> Self {
        Self {
            disagreement: DEFAULT_DISAGREEMENT_THRESHOLD,
            uncertainty: DEFAULT_UNCERTAINTY_THRESHOLD,
        }
    }
}

/// The consensus grade for one question block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalGrade {
    /// Consensus total, rounded to two decimals.
    pub total: f64,
    /// Per-criterion breakdown from the first grade, or synthesized by
    /// proportional distribution when no grade carried one.
    pub per_criterion: Breakdown,
}

/// One grading run's fused outcome. Immutable after return; later human
/// edits happen in the persistence collaborator, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionResult {
    #[serde(rename = "final")]
    pub final_grade: FinalGrade,
    /// Population standard deviation of scorer totals.
    pub disagreement: f64,
    /// True when the result warrants human attention. Not an error state:
    /// the grade is still usable.
    pub needs_review: bool,
    /// Which scoring path produced this result.
    pub kind: Modality,
    /// Optional diagnostics payload for review tooling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<serde_json::Value>,
}

/// Fuse one or more uniform grades into a consensus result.
///
/// Empty input fails safe: zero total, disagreement pinned to 1.0, review
/// required. A silent zero-confidence auto-accept is the one outcome this
/// function must never produce.
pub fn fuse(
    grades: &[UniformGrade],
    rubric: &Rubric,
    kind: Modality,
    thresholds: &ReviewThresholds,
) -> FusionResult {
    if grades.is_empty() {
        return FusionResult {
            final_grade: FinalGrade {
                total: 0.0,
                per_criterion: rubric.zero_breakdown(),
            },
            disagreement: 1.0,
            needs_review: true,
            kind,
            debug: None,
        };
    }

    let totals: Vec<f64> = grades.iter().map(|g| g.total).collect();
    let mean_total = totals.iter().sum::<f64>() / totals.len() as f64;
    let disagreement = population_stddev(&totals);
    let needs_review = disagreement > thresholds.disagreement
        || grades.iter().any(|g| g.uncertainty > thresholds.uncertainty);

    // Submission order is canonical: the first grade's criterion list wins,
    // keeping results reproducible across runs.
    let per_criterion = if grades[0].per_criterion.is_empty() {
        distribute_proportionally(mean_total, rubric)
    } else {
        grades[0].per_criterion.clone()
    };

    FusionResult {
        final_grade: FinalGrade {
            total: (mean_total * 100.0).round() / 100.0,
            per_criterion,
        },
        disagreement,
        needs_review,
        kind,
        debug: None,
    }
}

/// Population standard deviation; 0 for fewer than two samples.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
