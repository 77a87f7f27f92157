//! Service trait seams between the grading engine and its scorers.
//!
//! The engine holds these as injected `Arc<dyn …>` handles; implementations
//! live in `rubricon-math`, `rubricon-runner`, and `rubricon-oracle`. The
//! core itself carries no process-wide mutable state.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::grade::{CodeVerdict, MathVerdict};
use crate::model::{CodeSubmission, TestCase};
use crate::router::Modality;
use crate::rubric::Rubric;

// ---------------------------------------------------------------------------
// Scoring oracle (external text scorer)
// ---------------------------------------------------------------------------

/// Trait for the external text-scoring oracle.
///
/// The oracle is non-deterministic and untrusted: whatever it returns goes
/// through the alignment layer before anything else sees it.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Human-readable oracle name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Score one answer against a rubric.
    async fn score(&self, request: &OracleRequest) -> anyhow::Result<OracleReply>;
}

/// Request sent to the text-scoring oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRequest {
    pub question: String,
    pub ideal_answer: String,
    /// Rubric serialized as JSON for the oracle prompt.
    pub rubric_json: String,
    pub student_answer: String,
    /// Response language (e.g. "English").
    pub language: String,
    /// Persona variation for ensemble grading.
    #[serde(default)]
    pub persona: Option<Persona>,
    /// Historical exemplars for consistency context.
    #[serde(default)]
    pub exemplars: Vec<Exemplar>,
}

/// A distinct oracle invocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Short label (e.g. "strict").
    pub name: String,
    /// Extra instruction injected into the oracle prompt.
    pub instruction: String,
}

/// The oracle's raw scoring payload.
///
/// Field names are deliberately tolerant: oracles have been observed to
/// answer with `total` or `total_score`, and to call the breakdown list
/// `criteria`, `rubric`, or `rubric_scores`. Nothing here is trusted —
/// the alignment layer re-derives every number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleReply {
    #[serde(default, alias = "total_score")]
    pub total: Option<f64>,
    #[serde(default, alias = "rubric", alias = "rubric_scores")]
    pub criteria: Vec<OracleScoreEntry>,
    #[serde(default)]
    pub uncertainty: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// One criterion score as named by the oracle (free text, untrusted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleScoreEntry {
    #[serde(alias = "criteria", alias = "id", alias = "test")]
    pub criterion: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: f64,
}

/// Accept a number or a numeric string; anything else scores zero.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

// ---------------------------------------------------------------------------
// Math scorer
// ---------------------------------------------------------------------------

/// Trait for the symbolic/numeric math scorer. Pure CPU, infallible:
/// unparsable input scores zero with an explicit reason.
pub trait MathScorer: Send + Sync {
    fn grade(&self, student: &str, ideal: &str, rubric: &Rubric) -> MathVerdict;
}

// ---------------------------------------------------------------------------
// Code scorer
// ---------------------------------------------------------------------------

/// Trait for the sandboxed code scorer. Infallible at this seam: sandbox
/// crashes and timeouts convert into failing test results inside the
/// implementation, never into errors here.
#[async_trait]
pub trait CodeScorer: Send + Sync {
    async fn grade(
        &self,
        submission: &CodeSubmission,
        tests: &[TestCase],
        rubric: &Rubric,
    ) -> CodeVerdict;
}

// ---------------------------------------------------------------------------
// Retrieval collaborator
// ---------------------------------------------------------------------------

/// Trait for the exemplar/context retrieval collaborator.
///
/// The engine functions (degraded) when retrieval returns nothing or
/// errors; context only backfills a missing rubric/ideal and enriches the
/// oracle prompt.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    async fn retrieve(
        &self,
        question_id: &str,
        question: &str,
        k: usize,
    ) -> anyhow::Result<RetrievedContext>;
}

/// Context pulled for one question.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    /// Rubric backfill when the block carries none.
    pub rubric: Option<Rubric>,
    /// Ideal-answer backfill.
    pub ideal: Option<String>,
    /// Scored historical answers for the oracle prompt.
    pub exemplars: Vec<Exemplar>,
}

/// A historical exemplar answer with its metadata (e.g. awarded score).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exemplar {
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// External router override
// ---------------------------------------------------------------------------

/// Optional external modality classifier. Errors fall back to the
/// built-in heuristic; the router never fails.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> anyhow::Result<Modality>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_reply_accepts_aliased_fields() {
        let reply: OracleReply = serde_json::from_str(
            r#"{"total_score": 7, "rubric_scores": [{"criteria": "Logic", "score": 4}]}"#,
        )
        .unwrap();
        assert_eq!(reply.total, Some(7.0));
        assert_eq!(reply.criteria[0].criterion, "Logic");
        assert_eq!(reply.criteria[0].score, 4.0);
    }

    #[test]
    fn oracle_reply_accepts_canonical_fields() {
        let reply: OracleReply = serde_json::from_str(
            r#"{"total": 3.5, "criteria": [{"criterion": "A", "score": "3"}], "uncertainty": 0.2}"#,
        )
        .unwrap();
        assert_eq!(reply.total, Some(3.5));
        assert_eq!(reply.criteria[0].score, 3.0);
        assert_eq!(reply.uncertainty, Some(0.2));
    }

    #[test]
    fn lenient_score_defaults_to_zero() {
        let reply: OracleReply = serde_json::from_str(
            r#"{"criteria": [{"criteria": "A", "score": "lots"}, {"criteria": "B", "score": null}]}"#,
        )
        .unwrap();
        assert_eq!(reply.criteria[0].score, 0.0);
        assert_eq!(reply.criteria[1].score, 0.0);
        assert!(reply.total.is_none());
    }
}
