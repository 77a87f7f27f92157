//! Grading knobs with their defaults.
//!
//! Every heuristic constant the pipeline uses is named here and
//! overridable from the TOML config. The defaults are the calibrated
//! values; changing them changes grading behavior, so tests pin them.

use serde::{Deserialize, Serialize};

use crate::align::DEFAULT_FUZZY_CUTOFF;
use crate::fusion::ReviewThresholds;
use crate::traits::Persona;

/// Tunable grading parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Similarity cutoff for fuzzy criterion-name matching.
    #[serde(default = "default_fuzzy_cutoff")]
    pub fuzzy_cutoff: f64,
    /// Disagreement/uncertainty thresholds for the needs-review flag.
    #[serde(default)]
    pub review: ReviewThresholds,
    /// Partial-credit band for near-miss math answers: when the earned
    /// fraction falls strictly inside (low, high), the total is floored.
    #[serde(default = "default_generosity_low")]
    pub generosity_low: f64,
    #[serde(default = "default_generosity_high")]
    pub generosity_high: f64,
    /// Floor applied inside the band, as a fraction of the rubric total.
    #[serde(default = "default_generosity_floor")]
    pub generosity_floor: f64,
    /// Credit fraction for code that compiles but ships no tests.
    #[serde(default = "default_syntax_tier")]
    pub syntax_tier: f64,
    /// Credit fraction for untested code whose smoke run produces output.
    #[serde(default = "default_smoke_tier")]
    pub smoke_tier: f64,
    /// Wall-clock limit for one sandboxed program run, in seconds.
    #[serde(default = "default_exec_time_limit")]
    pub exec_time_limit_secs: u64,
    /// Wall-clock limit for one oracle call, in seconds.
    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_secs: u64,
    /// Independent math-scorer runs fused per question.
    #[serde(default = "default_math_runs")]
    pub math_ensemble_runs: usize,
    /// Exemplars requested from retrieval per question.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    /// Language the oracle is asked to write feedback in.
    #[serde(default = "default_language")]
    pub language: String,
    /// Persona ensemble for the text path. Each persona is one oracle
    /// call; their grades are fused.
    #[serde(default = "default_personas")]
    pub personas: Vec<Persona>,
}

fn default_fuzzy_cutoff() -> f64 {
    DEFAULT_FUZZY_CUTOFF
}
fn default_generosity_low() -> f64 {
    0.05
}
fn default_generosity_high() -> f64 {
    0.25
}
fn default_generosity_floor() -> f64 {
    0.2
}
fn default_syntax_tier() -> f64 {
    0.2
}
fn default_smoke_tier() -> f64 {
    0.4
}
fn default_exec_time_limit() -> u64 {
    6
}
fn default_oracle_timeout() -> u64 {
    60
}
fn default_math_runs() -> usize {
    2
}
fn default_retrieval_k() -> usize {
    3
}
fn default_language() -> String {
    "English".to_string()
}

fn default_personas() -> Vec<Persona> {
    vec![
        Persona {
            name: "strict".to_string(),
            instruction: "Grade strictly. Award points only for claims that are \
                          explicitly and correctly stated."
                .to_string(),
        },
        Persona {
            name: "lenient".to_string(),
            instruction: "Grade generously. Award partial credit for answers that \
                          show understanding even when imprecisely worded."
                .to_string(),
        },
    ]
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            fuzzy_cutoff: default_fuzzy_cutoff(),
            review: ReviewThresholds::default(),
            generosity_low: default_generosity_low(),
            generosity_high: default_generosity_high(),
            generosity_floor: default_generosity_floor(),
            syntax_tier: default_syntax_tier(),
            smoke_tier: default_smoke_tier(),
            exec_time_limit_secs: default_exec_time_limit(),
            oracle_timeout_secs: default_oracle_timeout(),
            math_ensemble_runs: default_math_runs(),
            retrieval_k: default_retrieval_k(),
            language: default_language(),
            personas: default_personas(),
        }
    }
}
