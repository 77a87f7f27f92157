//! Canonical rubric representation and proportional score distribution.
//!
//! Every scorer in the system works against a [`Rubric`]: an ordered list
//! of criteria with maximum point values. Heterogeneous instructor inputs
//! (plain text, bare lists, documents with a `criteria` key) are normalized
//! at the boundary via [`RubricSource`]; everything past that boundary
//! operates on the canonical types only.

use serde::{Deserialize, Serialize};

use crate::error::RubricError;

/// One scoring criterion with its maximum point value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricItem {
    /// Criterion name, unique within a rubric after normalization.
    #[serde(alias = "criteria")]
    pub criterion: String,
    /// Maximum points awardable for this criterion.
    #[serde(alias = "points")]
    pub max_points: u32,
}

/// An ordered set of scoring criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rubric {
    items: Vec<RubricItem>,
}

impl Rubric {
    /// Build a rubric, rejecting duplicate (case/whitespace-folded)
    /// criterion names. Fuzzy alignment cannot disambiguate duplicates, so
    /// construction is the one place in the core that hard-errors.
    pub fn new(items: Vec<RubricItem>) -> Result<Self, RubricError> {
        let mut seen = std::collections::HashSet::new();
        for item in &items {
            let key = normalize_criterion(&item.criterion);
            if !seen.insert(key) {
                return Err(RubricError::DuplicateCriterion(item.criterion.clone()));
            }
        }
        Ok(Self { items })
    }

    /// Convenience constructor from `(name, points)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, RubricError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(criterion, max_points)| RubricItem {
                    criterion: criterion.into(),
                    max_points,
                })
                .collect(),
        )
    }

    pub fn items(&self) -> &[RubricItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all criteria's maximum points.
    pub fn total_possible(&self) -> u32 {
        self.items.iter().map(|i| i.max_points).sum()
    }

    /// A breakdown awarding zero on every criterion.
    pub fn zero_breakdown(&self) -> Breakdown {
        Breakdown {
            entries: self
                .items
                .iter()
                .map(|i| ScoreEntry {
                    criterion: i.criterion.clone(),
                    score: 0,
                })
                .collect(),
        }
    }

    /// A breakdown awarding full marks on every criterion.
    pub fn full_breakdown(&self) -> Breakdown {
        Breakdown {
            entries: self
                .items
                .iter()
                .map(|i| ScoreEntry {
                    criterion: i.criterion.clone(),
                    score: i.max_points,
                })
                .collect(),
        }
    }
}

/// Case-fold and collapse whitespace for criterion-name comparison.
pub fn normalize_criterion(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Per-criterion score assignment, aligned 1:1 and in order with a rubric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakdown {
    entries: Vec<ScoreEntry>,
}

/// An awarded score for one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(alias = "criteria")]
    pub criterion: String,
    pub score: u32,
}

impl Breakdown {
    pub fn new(entries: Vec<ScoreEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|e| e.score).sum()
    }
}

/// Heterogeneous rubric input, normalized once at the boundary.
///
/// Instructors and upstream tooling hand us rubrics as JSON text, bare
/// lists, or documents with a `criteria` key. Unknown shapes normalize to
/// an empty rubric rather than erroring; a degenerate rubric scores zero
/// with an explicit reason downstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RubricSource {
    Items(Vec<RubricItem>),
    Document { criteria: Vec<RubricItem> },
    Text(String),
}

impl RubricSource {
    /// Normalize into a canonical [`Rubric`].
    ///
    /// Duplicate criteria still reject: that is a malformed input the
    /// caller must fix, not something alignment can paper over.
    pub fn normalize(self) -> Result<Rubric, RubricError> {
        match self {
            RubricSource::Items(items) => Rubric::new(items),
            RubricSource::Document { criteria } => Rubric::new(criteria),
            RubricSource::Text(text) => {
                // Attempt a structured parse of the text; anything else is
                // an unknown shape and yields an empty rubric.
                match serde_json::from_str::<RubricSource>(&text) {
                    Ok(RubricSource::Text(_)) | Err(_) => Ok(Rubric::default()),
                    Ok(inner) => inner.normalize(),
                }
            }
        }
    }
}

/// Allocate `total_award` across rubric items proportionally to their
/// weight, then correct rounding drift one point at a time, round-robin,
/// skipping items already at their floor (0) or ceiling (max_points).
///
/// Guarantees: the breakdown sums to exactly `round(total_award)` whenever
/// `0 <= total_award <= total_possible`, every entry stays within
/// `[0, max_points]`, and the output is deterministic.
pub fn distribute_proportionally(total_award: f64, rubric: &Rubric) -> Breakdown {
    let possible = rubric.total_possible();
    if possible == 0 || rubric.is_empty() {
        return rubric.zero_breakdown();
    }

    let target = total_award.round().clamp(0.0, possible as f64) as i64;

    let mut scores: Vec<i64> = rubric
        .items()
        .iter()
        .map(|item| {
            let share = total_award * (item.max_points as f64 / possible as f64);
            share.round() as i64
        })
        .collect();

    // Initial rounding may already overshoot an item's bounds.
    for (score, item) in scores.iter_mut().zip(rubric.items()) {
        *score = (*score).clamp(0, item.max_points as i64);
    }

    let mut drift = target - scores.iter().sum::<i64>();
    let mut idx = 0usize;
    let mut stalled = 0usize;
    while drift != 0 && stalled < rubric.len() {
        let max = rubric.items()[idx].max_points as i64;
        let adjusted = if drift > 0 && scores[idx] < max {
            scores[idx] += 1;
            drift -= 1;
            true
        } else if drift < 0 && scores[idx] > 0 {
            scores[idx] -= 1;
            drift += 1;
            true
        } else {
            false
        };
        stalled = if adjusted { 0 } else { stalled + 1 };
        idx = (idx + 1) % rubric.len();
    }

    Breakdown {
        entries: rubric
            .items()
            .iter()
            .zip(scores)
            .map(|(item, score)| ScoreEntry {
                criterion: item.criterion.clone(),
                score: score as u32,
            })
            .collect(),
    }
}
