//! Core error types.
//!
//! Per-scorer failures are absorbed into degraded grades and never surface
//! here; the only errors that propagate to callers are programmer errors
//! in rubric construction.

use thiserror::Error;

/// Errors raised while constructing or normalizing a rubric.
#[derive(Debug, Error)]
pub enum RubricError {
    /// Two items share a normalized criterion name. Fuzzy alignment cannot
    /// disambiguate duplicates, so the rubric is rejected outright.
    #[error("duplicate rubric criterion: {0:?}")]
    DuplicateCriterion(String),
}
