//! rubricon-math — Symbolic and numeric math scoring.
//!
//! Grades a student expression against an ideal one: LaTeX preprocessing,
//! expression parsing, polynomial equality for full credit, and seeded
//! numeric sampling for partial credit. Pure CPU, fully deterministic,
//! and infallible: every input produces a verdict with an explicit reason.

pub mod latex;
pub mod parser;
pub mod poly;
pub mod sample;

use rubricon_core::config::GradingConfig;
use rubricon_core::grade::{MathDetails, MathReason, MathVerdict};
use rubricon_core::rubric::{distribute_proportionally, Rubric};
use rubricon_core::traits::MathScorer;

use crate::parser::Expr;

/// The default math scorer.
#[derive(Debug, Clone)]
pub struct SymbolicScorer {
    /// Partial-credit band: a near-miss agreement fraction strictly inside
    /// `(low, high)` is floored so close answers do not collapse to zero.
    pub generosity_low: f64,
    pub generosity_high: f64,
    /// Floor inside the band, as a fraction of the rubric total.
    pub generosity_floor: f64,
}

impl Default for SymbolicScorer {
    fn default() -> Self {
        Self {
            generosity_low: 0.05,
            generosity_high: 0.25,
            generosity_floor: 0.2,
        }
    }
}

impl SymbolicScorer {
    pub fn from_config(config: &GradingConfig) -> Self {
        Self {
            generosity_low: config.generosity_low,
            generosity_high: config.generosity_high,
            generosity_floor: config.generosity_floor,
        }
    }

    fn parse_input(text: &str) -> Option<Expr> {
        parser::parse(&latex::to_plain_math(text))
    }

    /// Raw points before rounding, generosity band applied.
    fn award_for_fraction(&self, fraction: f64, total_points: u32) -> f64 {
        let raw = fraction * total_points as f64;
        if fraction > self.generosity_low && fraction < self.generosity_high {
            raw.max(self.generosity_floor * total_points as f64)
        } else {
            raw
        }
    }
}

impl MathScorer for SymbolicScorer {
    fn grade(&self, student: &str, ideal: &str, rubric: &Rubric) -> MathVerdict {
        let total_points = rubric.total_possible();
        if total_points == 0 {
            return MathVerdict {
                total: 0,
                breakdown: rubric.zero_breakdown(),
                details: MathDetails {
                    reason: MathReason::RubricTotalZero,
                    symbolic_equal: false,
                    fraction: 0.0,
                    free_symbols: vec![],
                },
            };
        }

        let (student_expr, ideal_expr) =
            match (Self::parse_input(student), Self::parse_input(ideal)) {
                (Some(s), Some(i)) => (s, i),
                _ => {
                    tracing::debug!("math parse failed, awarding zero");
                    return MathVerdict {
                        total: 0,
                        breakdown: rubric.zero_breakdown(),
                        details: MathDetails {
                            reason: MathReason::ParseFailed,
                            symbolic_equal: false,
                            fraction: 0.0,
                            free_symbols: vec![],
                        },
                    };
                }
            };

        let free_symbols = sample::sampled_symbols(&student_expr, &ideal_expr);

        if student_expr == ideal_expr || poly::symbolic_equal(&student_expr, &ideal_expr) {
            return MathVerdict {
                total: total_points,
                breakdown: rubric.full_breakdown(),
                details: MathDetails {
                    reason: MathReason::ExactMatch,
                    symbolic_equal: true,
                    fraction: 1.0,
                    free_symbols,
                },
            };
        }

        let fraction = sample::agreement_fraction(&student_expr, &ideal_expr);
        let total = self.award_for_fraction(fraction, total_points).round() as u32;

        MathVerdict {
            total,
            breakdown: distribute_proportionally(total as f64, rubric),
            details: MathDetails {
                reason: MathReason::NumericSampling,
                symbolic_equal: false,
                fraction,
                free_symbols,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric() -> Rubric {
        Rubric::from_pairs([("Setup", 4), ("Answer", 6)]).unwrap()
    }

    fn grade(student: &str, ideal: &str) -> MathVerdict {
        SymbolicScorer::default().grade(student, ideal, &rubric())
    }

    #[test]
    fn equivalent_forms_get_full_credit() {
        let v = grade("x^2 + 2x + 1", "(x + 1)^2");
        assert_eq!(v.total, 10);
        assert_eq!(v.details.reason, MathReason::ExactMatch);
        assert!(v.details.symbolic_equal);
        assert_eq!(v.breakdown.total(), 10);
    }

    #[test]
    fn latex_and_plain_compare_equal() {
        let v = grade(r"$\frac{1}{2}$", "0.5");
        assert_eq!(v.total, 10);
        assert_eq!(v.details.reason, MathReason::ExactMatch);
    }

    #[test]
    fn trig_identity_full_credit_via_sampling() {
        let v = grade("sin(x)^2 + cos(x)^2", "1");
        // Not a polynomial, but agreement is total.
        assert_eq!(v.total, 10);
        assert_eq!(v.details.reason, MathReason::NumericSampling);
        assert_eq!(v.details.fraction, 1.0);
    }

    #[test]
    fn wrong_answer_scores_zero() {
        let v = grade("x + 1", "x + 2");
        assert_eq!(v.total, 0);
        assert_eq!(v.details.reason, MathReason::NumericSampling);
        assert_eq!(v.details.fraction, 0.0);
    }

    #[test]
    fn unparsable_input_scores_zero_with_reason() {
        let v = grade("no idea, sorry!", "x + 1");
        assert_eq!(v.total, 0);
        assert_eq!(v.details.reason, MathReason::ParseFailed);
        assert_eq!(v.breakdown.total(), 0);
    }

    #[test]
    fn zero_point_rubric_awards_nothing() {
        let r = Rubric::from_pairs([("A", 0u32)]).unwrap();
        let v = SymbolicScorer::default().grade("x", "x", &r);
        assert_eq!(v.total, 0);
        assert_eq!(v.details.reason, MathReason::RubricTotalZero);
    }

    #[test]
    fn generosity_floors_near_misses() {
        let scorer = SymbolicScorer::default();
        // Inside the band: floored to 20% of 10 points.
        assert_eq!(scorer.award_for_fraction(0.10, 10), 2.0);
        // At or below the low edge: no floor.
        assert_eq!(scorer.award_for_fraction(0.05, 10), 0.5);
        assert_eq!(scorer.award_for_fraction(0.0, 10), 0.0);
        // At or above the high edge: proportional.
        assert_eq!(scorer.award_for_fraction(0.25, 10), 2.5);
        assert_eq!(scorer.award_for_fraction(1.0, 10), 10.0);
    }

    #[test]
    fn equation_and_expression_forms_agree() {
        let v = grade("y = x + 1", "y - x = 1");
        assert_eq!(v.total, 10);
    }

    #[test]
    fn repeated_grading_is_deterministic() {
        let first = grade("abs(x)", "x");
        for _ in 0..5 {
            let again = grade("abs(x)", "x");
            assert_eq!(again.total, first.total);
            assert_eq!(again.details.fraction, first.details.fraction);
        }
    }

    #[test]
    fn breakdown_distributes_partial_credit() {
        let v = grade("abs(x)", "x");
        assert_eq!(v.breakdown.total(), v.total);
        for entry in v.breakdown.entries() {
            assert!(entry.score <= 6);
        }
    }
}
