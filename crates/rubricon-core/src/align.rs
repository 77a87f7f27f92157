//! Oracle alignment layer.
//!
//! The text-scoring oracle returns criterion names as free text. This
//! layer maps that untrusted structure onto the canonical rubric: exact
//! lookup on normalized names, fuzzy nearest-neighbor on miss, clamping to
//! rubric bounds, and an authoritative recomputed total. The oracle's
//! arithmetic and naming fidelity are never trusted.

use serde::{Deserialize, Serialize};

use crate::rubric::{normalize_criterion, Breakdown, Rubric, ScoreEntry};
use crate::traits::OracleReply;

/// Default similarity cutoff for fuzzy criterion matching.
pub const DEFAULT_FUZZY_CUTOFF: f64 = 0.60;

/// Diagnostics recorded while aligning an oracle reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentDiagnostics {
    /// Rubric criteria the oracle never addressed (no exact or fuzzy hit).
    pub unknown_criteria: Vec<String>,
    /// Items whose pre-clamp score exceeded the criterion maximum.
    pub over_allocated: Vec<OverAllocation>,
    /// True when any score arrived as a non-integer and was rounded.
    pub coerced_types: bool,
    /// How many usable items the oracle reply contained.
    pub model_items_seen: usize,
    /// The oracle's self-reported total, kept when it disagrees with ours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_total: Option<f64>,
    /// Sum of clamped per-criterion scores; always authoritative.
    pub recomputed_total: u32,
}

/// One over-allocation record: what the oracle claimed vs. the maximum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverAllocation {
    pub criterion: String,
    pub score: i64,
    pub max: u32,
}

/// Align an oracle reply onto the rubric.
///
/// Returns a breakdown aligned 1:1 with the rubric plus diagnostics. The
/// breakdown's sum (`recomputed_total`) is the score of record regardless
/// of what the oracle reported.
pub fn align(rubric: &Rubric, reply: &OracleReply, fuzzy_cutoff: f64) -> (Breakdown, AlignmentDiagnostics) {
    let mut diag = AlignmentDiagnostics::default();
    if rubric.is_empty() {
        return (Breakdown::default(), diag);
    }

    // Normalized oracle name -> rounded score. Later duplicates win, as a
    // plain map insert would.
    let mut by_name: Vec<(String, i64)> = Vec::new();
    for item in &reply.criteria {
        let key = normalize_criterion(&item.criterion);
        if key.is_empty() {
            continue;
        }
        if item.score.fract() != 0.0 {
            diag.coerced_types = true;
        }
        let score = item.score.round() as i64;
        if let Some(existing) = by_name.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = score;
        } else {
            by_name.push((key, score));
        }
        diag.model_items_seen += 1;
    }

    let mut entries = Vec::with_capacity(rubric.len());
    for item in rubric.items() {
        let norm = normalize_criterion(&item.criterion);
        let resolved = by_name
            .iter()
            .find(|(k, _)| *k == norm)
            .map(|(_, s)| *s)
            .or_else(|| fuzzy_lookup(&norm, &by_name, fuzzy_cutoff));

        let score = match resolved {
            Some(s) => s,
            None => {
                diag.unknown_criteria.push(item.criterion.clone());
                0
            }
        };

        if score > item.max_points as i64 {
            diag.over_allocated.push(OverAllocation {
                criterion: item.criterion.clone(),
                score,
                max: item.max_points,
            });
        }
        let clamped = score.clamp(0, item.max_points as i64) as u32;
        entries.push(ScoreEntry {
            criterion: item.criterion.clone(),
            score: clamped,
        });
    }

    let breakdown = Breakdown::new(entries);
    diag.recomputed_total = breakdown.total();
    if let Some(reported) = reply.total {
        if (reported - diag.recomputed_total as f64).abs() > f64::EPSILON {
            diag.reported_total = Some(reported);
        }
    }

    (breakdown, diag)
}

/// Single best fuzzy match at or above the cutoff, else none.
fn fuzzy_lookup(target: &str, candidates: &[(String, i64)], cutoff: f64) -> Option<i64> {
    let mut best: Option<(f64, i64)> = None;
    for (name, score) in candidates {
        let similarity = strsim::normalized_levenshtein(target, name);
        if similarity >= cutoff && best.is_none_or(|(b, _)| similarity > b) {
            best = Some((similarity, *score));
        }
    }
    best.map(|(_, s)| s)
}

/// Render the per-criterion header prepended to oracle feedback.
pub fn feedback_header(rubric: &Rubric, breakdown: &Breakdown) -> String {
    let total = breakdown.total();
    let possible = rubric.total_possible();
    let mut lines = vec![format!("**Total: {total}/{possible}**"), "Rubric Breakdown:".to_string()];
    for (item, entry) in rubric.items().iter().zip(breakdown.entries()) {
        lines.push(format!("- {}: {}/{}", item.criterion, entry.score, item.max_points));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::OracleScoreEntry;

    fn rubric(pairs: &[(&str, u32)]) -> Rubric {
        Rubric::from_pairs(pairs.iter().map(|&(c, p)| (c, p))).unwrap()
    }

    fn reply(entries: &[(&str, f64)], total: Option<f64>) -> OracleReply {
        OracleReply {
            total,
            criteria: entries
                .iter()
                .map(|&(criterion, score)| OracleScoreEntry {
                    criterion: criterion.to_string(),
                    score,
                })
                .collect(),
            uncertainty: None,
            feedback: None,
        }
    }

    #[test]
    fn exact_match_after_normalization() {
        let r = rubric(&[("Clarity", 5)]);
        let (b, diag) = align(&r, &reply(&[("  CLARITY ", 4.0)], None), DEFAULT_FUZZY_CUTOFF);
        assert_eq!(b.entries()[0].score, 4);
        assert!(diag.unknown_criteria.is_empty());
    }

    #[test]
    fn fuzzy_match_misspelling() {
        let r = rubric(&[("Clarity", 5), ("Completeness", 5)]);
        let (b, diag) = align(&r, &reply(&[("clairty", 3.0)], None), DEFAULT_FUZZY_CUTOFF);
        // "clairty" ~ "clarity" well above 0.60; "Completeness" has no hit.
        assert_eq!(b.entries()[0].score, 3);
        assert_eq!(b.entries()[1].score, 0);
        assert_eq!(diag.unknown_criteria, vec!["Completeness".to_string()]);
    }

    #[test]
    fn fuzzy_cutoff_boundary() {
        // "abcde" vs "abzze": distance 2, normalized 1 - 2/5 = 0.60 exactly,
        // accepted at the cutoff. "abcde" vs "azzze": 0.40, rejected.
        let r = rubric(&[("abcde", 10)]);
        let (b, _) = align(&r, &reply(&[("abzze", 6.0)], None), DEFAULT_FUZZY_CUTOFF);
        assert_eq!(b.entries()[0].score, 6);
        let (b, diag) = align(&r, &reply(&[("azzze", 6.0)], None), DEFAULT_FUZZY_CUTOFF);
        assert_eq!(b.entries()[0].score, 0);
        assert_eq!(diag.unknown_criteria.len(), 1);
    }

    #[test]
    fn clamps_over_allocation() {
        let r = rubric(&[("Logic", 5)]);
        let (b, diag) = align(&r, &reply(&[("Logic", 9.0)], None), DEFAULT_FUZZY_CUTOFF);
        assert_eq!(b.entries()[0].score, 5);
        assert_eq!(diag.over_allocated.len(), 1);
        assert_eq!(diag.over_allocated[0].score, 9);
    }

    #[test]
    fn clamps_negative_scores_to_zero() {
        let r = rubric(&[("Logic", 5)]);
        let (b, _) = align(&r, &reply(&[("Logic", -2.0)], None), DEFAULT_FUZZY_CUTOFF);
        assert_eq!(b.entries()[0].score, 0);
    }

    #[test]
    fn coerces_fractional_scores() {
        let r = rubric(&[("Logic", 5)]);
        let (b, diag) = align(&r, &reply(&[("Logic", 3.6)], None), DEFAULT_FUZZY_CUTOFF);
        assert_eq!(b.entries()[0].score, 4);
        assert!(diag.coerced_types);
    }

    #[test]
    fn recomputed_total_is_authoritative() {
        let r = rubric(&[("A", 5), ("B", 5)]);
        let (b, diag) = align(
            &r,
            &reply(&[("A", 3.0), ("B", 2.0)], Some(10.0)),
            DEFAULT_FUZZY_CUTOFF,
        );
        assert_eq!(b.total(), 5);
        assert_eq!(diag.recomputed_total, 5);
        assert_eq!(diag.reported_total, Some(10.0));
    }

    #[test]
    fn matching_reported_total_not_recorded() {
        let r = rubric(&[("A", 5)]);
        let (_, diag) = align(&r, &reply(&[("A", 3.0)], Some(3.0)), DEFAULT_FUZZY_CUTOFF);
        assert!(diag.reported_total.is_none());
    }

    #[test]
    fn empty_reply_zeroes_everything() {
        let r = rubric(&[("A", 5), ("B", 3)]);
        let (b, diag) = align(&r, &OracleReply::default(), DEFAULT_FUZZY_CUTOFF);
        assert_eq!(b.total(), 0);
        assert_eq!(diag.unknown_criteria.len(), 2);
        assert_eq!(diag.model_items_seen, 0);
    }

    #[test]
    fn feedback_header_format() {
        let r = rubric(&[("Clarity", 5), ("Depth", 5)]);
        let (b, _) = align(
            &r,
            &reply(&[("Clarity", 4.0), ("Depth", 2.0)], None),
            DEFAULT_FUZZY_CUTOFF,
        );
        let header = feedback_header(&r, &b);
        assert!(header.starts_with("**Total: 6/10**"));
        assert!(header.contains("- Clarity: 4/5"));
        assert!(header.contains("- Depth: 2/5"));
    }
}
