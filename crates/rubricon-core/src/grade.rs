//! Scorer verdict types and the uniform grade currency.
//!
//! Each scorer (math, code, oracle-backed text) produces a typed verdict
//! with auditable details. Verdicts are transient: they convert into
//! exactly one [`UniformGrade`] before fusion, and fusion only ever sees
//! uniform grades.

use serde::{Deserialize, Serialize};

use crate::rubric::Breakdown;

/// Uncertainty assigned to deterministic scorers (math/code). Their
/// verdicts are reproducible but the underlying heuristics are not exact,
/// so they sit below the review threshold without claiming certainty.
pub const SCORER_UNCERTAINTY: f64 = 0.3;

/// Uncertainty assigned to an oracle reply that did not self-report one.
pub const ORACLE_DEFAULT_UNCERTAINTY: f64 = 0.35;

/// Uncertainty pinned on a degraded grade (oracle failure or timeout).
pub const DEGRADED_UNCERTAINTY: f64 = 0.9;

/// The canonical internal currency between scorers and the fusion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformGrade {
    /// Total points awarded.
    pub total: f64,
    /// Per-criterion breakdown aligned with the rubric; may be empty when
    /// a scorer produced only a total.
    pub per_criterion: Breakdown,
    /// Scorer self-assessed uncertainty in `[0, 1]`.
    pub uncertainty: f64,
}

impl UniformGrade {
    /// A degraded grade standing in for a failed scorer invocation:
    /// zero points, elevated uncertainty, so fusion always receives
    /// well-formed input and flags the result for review.
    pub fn degraded() -> Self {
        Self {
            total: 0.0,
            per_criterion: Breakdown::default(),
            uncertainty: DEGRADED_UNCERTAINTY,
        }
    }
}

/// Math scorer output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathVerdict {
    pub total: u32,
    pub breakdown: Breakdown,
    pub details: MathDetails,
}

/// Auditable detail record for a math grading run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathDetails {
    pub reason: MathReason,
    pub symbolic_equal: bool,
    /// Fraction of numeric trials where student and ideal agreed.
    pub fraction: f64,
    /// Free symbols considered during sampling, sorted by name.
    pub free_symbols: Vec<String>,
}

/// Why the math scorer awarded what it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathReason {
    ExactMatch,
    NumericSampling,
    ParseFailed,
    RubricTotalZero,
}

impl std::fmt::Display for MathReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MathReason::ExactMatch => "exact_match",
            MathReason::NumericSampling => "numeric_sampling",
            MathReason::ParseFailed => "parse_failed",
            MathReason::RubricTotalZero => "rubric_total_zero",
        };
        f.write_str(s)
    }
}

/// Code scorer output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeVerdict {
    pub total: u32,
    pub breakdown: Breakdown,
    pub details: CodeDetails,
}

/// Auditable detail record for a code grading run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeDetails {
    pub reason: CodeReason,
    /// Tests passed, when tests were supplied.
    pub passed: Option<u32>,
    /// Tests run, when tests were supplied.
    pub total: Option<u32>,
    /// One record per failed test, for review UIs.
    #[serde(default)]
    pub failures: Vec<TestCaseFailure>,
}

/// Why the code scorer awarded what it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeReason {
    Blank,
    Tests,
    NoTestsAndBadCode,
    SmokeRunOutput,
    SmokeRunOk,
    SyntaxOkRuntimeIssue { stderr_excerpt: String },
}

impl std::fmt::Display for CodeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeReason::Blank => f.write_str("blank"),
            CodeReason::Tests => f.write_str("tests"),
            CodeReason::NoTestsAndBadCode => f.write_str("no_tests_and_bad_code"),
            CodeReason::SmokeRunOutput => f.write_str("smoke_run_output"),
            CodeReason::SmokeRunOk => f.write_str("smoke_run_ok"),
            CodeReason::SyntaxOkRuntimeIssue { stderr_excerpt } => {
                write!(f, "syntax_ok_runtime_issue: {stderr_excerpt}")
            }
        }
    }
}

/// One failed test case: what went in, what was expected, what came out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseFailure {
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub exit_code: i32,
    pub stderr: String,
}

impl From<&MathVerdict> for UniformGrade {
    fn from(v: &MathVerdict) -> Self {
        UniformGrade {
            total: v.total as f64,
            per_criterion: v.breakdown.clone(),
            uncertainty: SCORER_UNCERTAINTY,
        }
    }
}

impl From<&CodeVerdict> for UniformGrade {
    fn from(v: &CodeVerdict) -> Self {
        UniformGrade {
            total: v.total as f64,
            per_criterion: v.breakdown.clone(),
            uncertainty: SCORER_UNCERTAINTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_reason_display_matches_serde() {
        assert_eq!(MathReason::ExactMatch.to_string(), "exact_match");
        assert_eq!(
            serde_json::to_string(&MathReason::ParseFailed).unwrap(),
            "\"parse_failed\""
        );
    }

    #[test]
    fn code_reason_smoke_prefix() {
        assert!(CodeReason::SmokeRunOutput.to_string().starts_with("smoke_run"));
        assert!(CodeReason::SmokeRunOk.to_string().starts_with("smoke_run"));
    }

    #[test]
    fn degraded_grade_is_flaggable() {
        let g = UniformGrade::degraded();
        assert_eq!(g.total, 0.0);
        assert!(g.uncertainty > 0.5);
    }
}
