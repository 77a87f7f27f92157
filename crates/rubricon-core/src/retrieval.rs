//! In-memory exemplar store.
//!
//! A minimal retrieval collaborator good enough to run the engine locally
//! with no services: token-overlap search with per-question buckets.
//! Production deployments inject a real index behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::rubric::{Rubric, RubricSource};
use crate::traits::{Exemplar, RetrievalIndex, RetrievedContext};

/// What role a stored document plays for its question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Rubric,
    Ideal,
    Exemplar,
}

#[derive(Debug, Clone)]
struct StoredDoc {
    text: String,
    kind: DocKind,
    question_id: Option<String>,
    metadata: HashMap<String, String>,
}

/// Token-overlap document store, bucketed by question id.
#[derive(Debug, Default)]
pub struct ExemplarStore {
    docs: Vec<StoredDoc>,
}

impl ExemplarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. `question_id` binds the document to one question;
    /// unbound documents are found by text search only.
    pub fn add(
        &mut self,
        text: impl Into<String>,
        kind: DocKind,
        question_id: Option<&str>,
        metadata: HashMap<String, String>,
    ) {
        self.docs.push(StoredDoc {
            text: text.into(),
            kind,
            question_id: question_id.map(str::to_string),
            metadata,
        });
    }

    fn by_question(&self, question_id: &str, k: usize) -> Vec<&StoredDoc> {
        self.docs
            .iter()
            .filter(|d| d.question_id.as_deref() == Some(question_id))
            .take(k)
            .collect()
    }

    fn by_overlap(&self, query: &str, k: usize) -> Vec<&StoredDoc> {
        let query_tokens: std::collections::HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let mut scored: Vec<(usize, &StoredDoc)> = self
            .docs
            .iter()
            .map(|d| {
                let overlap = d
                    .text
                    .to_lowercase()
                    .split_whitespace()
                    .filter(|t| query_tokens.contains(*t))
                    .collect::<std::collections::HashSet<_>>()
                    .len();
                (overlap, d)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(k).map(|(_, d)| d).collect()
    }
}

#[async_trait]
impl RetrievalIndex for ExemplarStore {
    async fn retrieve(
        &self,
        question_id: &str,
        question: &str,
        k: usize,
    ) -> anyhow::Result<RetrievedContext> {
        let mut hits = self.by_question(question_id, k);
        if hits.is_empty() {
            hits = self.by_overlap(question, k);
        }

        let rubric: Option<Rubric> = hits
            .iter()
            .find(|d| d.kind == DocKind::Rubric)
            .and_then(|d| RubricSource::Text(d.text.clone()).normalize().ok())
            .filter(|r| !r.is_empty());
        let ideal = hits
            .iter()
            .find(|d| d.kind == DocKind::Ideal)
            .map(|d| d.text.clone());
        let exemplars = hits
            .iter()
            .filter(|d| d.kind == DocKind::Exemplar)
            .map(|d| Exemplar {
                text: d.text.clone(),
                metadata: d.metadata.clone(),
            })
            .collect();

        Ok(RetrievedContext {
            rubric,
            ideal,
            exemplars,
        })
    }
}

/// Retrieval stub that always returns empty context. The engine degrades
/// gracefully: no backfill, no exemplar enrichment.
#[derive(Debug, Default)]
pub struct NoRetrieval;

#[async_trait]
impl RetrievalIndex for NoRetrieval {
    async fn retrieve(&self, _: &str, _: &str, _: usize) -> anyhow::Result<RetrievedContext> {
        Ok(RetrievedContext::default())
    }
}
