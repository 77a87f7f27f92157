//! Central grading engine orchestrator.
//!
//! Routes each question block to a scoring path, gathers context,
//! ensembles the scorers, and fuses their grades. Per-block work runs
//! concurrently under a semaphore; results return in input order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::align::{align, feedback_header, AlignmentDiagnostics};
use crate::config::GradingConfig;
use crate::fusion::{fuse, FusionResult};
use crate::grade::{UniformGrade, ORACLE_DEFAULT_UNCERTAINTY};
use crate::model::{CodeSubmission, QuestionBlock};
use crate::report::{GradingReport, QuestionOutcome};
use crate::router::{classify_with, Modality};
use crate::rubric::Rubric;
use crate::traits::{
    Classifier, CodeScorer, MathScorer, OracleRequest, RetrievalIndex, RetrievedContext,
    ScoringOracle,
};

/// The central grading engine.
pub struct GradingEngine {
    oracle: Arc<dyn ScoringOracle>,
    math: Arc<dyn MathScorer>,
    code: Arc<dyn CodeScorer>,
    retrieval: Arc<dyn RetrievalIndex>,
    classifier: Option<Arc<dyn Classifier>>,
    config: GradingConfig,
}

impl GradingEngine {
    pub fn new(
        oracle: Arc<dyn ScoringOracle>,
        math: Arc<dyn MathScorer>,
        code: Arc<dyn CodeScorer>,
        retrieval: Arc<dyn RetrievalIndex>,
        config: GradingConfig,
    ) -> Self {
        Self {
            oracle,
            math,
            code,
            retrieval,
            classifier: None,
            config,
        }
    }

    /// Install an external modality classifier. Its errors fall back to
    /// the built-in heuristic.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Grade a batch of question blocks with bounded concurrency.
    ///
    /// Outcomes are returned in input order regardless of completion
    /// order, so reports are reproducible.
    pub async fn grade_batch(&self, blocks: &[QuestionBlock], parallelism: usize) -> GradingReport {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));

        let mut futures = FuturesUnordered::new();
        for (index, block) in blocks.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                // Closed semaphore cannot happen here; we hold the only handle.
                let _permit = semaphore.acquire_owned().await;
                (index, self.grade_block(block).await)
            });
        }

        let mut indexed: Vec<(usize, QuestionOutcome)> = Vec::with_capacity(blocks.len());
        while let Some(item) = futures.next().await {
            indexed.push(item);
        }
        indexed.sort_by_key(|(i, _)| *i);
        let outcomes = indexed.into_iter().map(|(_, o)| o).collect();

        GradingReport::new(
            self.oracle.name(),
            outcomes,
            start.elapsed().as_millis() as u64,
        )
    }

    /// Grade one question block end to end.
    pub async fn grade_block(&self, block: &QuestionBlock) -> QuestionOutcome {
        let context = match self
            .retrieval
            .retrieve(&block.id, &block.question_text, self.config.retrieval_k)
            .await
        {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(question = %block.id, "retrieval failed, grading without context: {e:#}");
                RetrievedContext::default()
            }
        };

        // Block-supplied rubric and ideal win; retrieval only backfills.
        let rubric = match &block.rubric {
            Some(source) => source.clone().normalize().unwrap_or_else(|e| {
                tracing::warn!(question = %block.id, "rubric rejected: {e}");
                Rubric::default()
            }),
            None => context.rubric.clone().unwrap_or_default(),
        };
        let ideal = if block.ideal_answer.trim().is_empty() {
            context.ideal.clone().unwrap_or_default()
        } else {
            block.ideal_answer.clone()
        };

        let kind = classify_with(
            self.classifier.as_deref(),
            &block.question_text,
            block.has_math_markup(),
            block.has_code_markup(),
        );
        tracing::debug!(question = %block.id, %kind, "routed");

        match kind {
            Modality::Math => self.grade_math(block, &rubric, &ideal),
            Modality::Code => self.grade_code(block, &rubric).await,
            Modality::Text => self.grade_text(block, &rubric, &ideal, &context).await,
        }
    }

    fn grade_math(&self, block: &QuestionBlock, rubric: &Rubric, ideal: &str) -> QuestionOutcome {
        let student = block
            .latex_fragments
            .iter()
            .find(|f| !f.trim().is_empty())
            .map(String::as_str)
            .unwrap_or(&block.question_text);

        let runs = self.config.math_ensemble_runs.max(1);
        let verdicts: Vec<_> = (0..runs)
            .map(|_| self.math.grade(student, ideal, rubric))
            .collect();
        let grades: Vec<UniformGrade> = verdicts.iter().map(UniformGrade::from).collect();

        let mut result = fuse(&grades, rubric, Modality::Math, &self.config.review);
        result.debug = serde_json::to_value(&verdicts[0].details).ok();
        QuestionOutcome {
            question_id: block.id.clone(),
            result,
            feedback: None,
        }
    }

    async fn grade_code(&self, block: &QuestionBlock, rubric: &Rubric) -> QuestionOutcome {
        let blank = CodeSubmission {
            language: "python".to_string(),
            content: String::new(),
        };
        let submission = block.code_block.as_ref().unwrap_or(&blank);
        let tests = block.tests.clone().unwrap_or_default();

        let verdict = self.code.grade(submission, &tests, rubric).await;
        let grades = [UniformGrade::from(&verdict)];

        let mut result = fuse(&grades, rubric, Modality::Code, &self.config.review);
        result.debug = serde_json::to_value(&verdict.details).ok();
        QuestionOutcome {
            question_id: block.id.clone(),
            result,
            feedback: None,
        }
    }

    async fn grade_text(
        &self,
        block: &QuestionBlock,
        rubric: &Rubric,
        ideal: &str,
        context: &RetrievedContext,
    ) -> QuestionOutcome {
        let rubric_json =
            serde_json::to_string(rubric).unwrap_or_else(|_| "[]".to_string());
        let timeout = Duration::from_secs(self.config.oracle_timeout_secs);

        // One oracle call per persona, awaited in persona order.
        let calls = self.config.personas.iter().map(|persona| {
            let request = OracleRequest {
                question: block.question_text.clone(),
                ideal_answer: ideal.to_string(),
                rubric_json: rubric_json.clone(),
                student_answer: block.question_text.clone(),
                language: self.config.language.clone(),
                persona: Some(persona.clone()),
                exemplars: context.exemplars.clone(),
            };
            let oracle = Arc::clone(&self.oracle);
            async move {
                match tokio::time::timeout(timeout, oracle.score(&request)).await {
                    Ok(Ok(reply)) => Some(reply),
                    Ok(Err(e)) => {
                        tracing::warn!(persona = %request.persona.as_ref().map(|p| p.name.as_str()).unwrap_or(""),
                            "oracle call failed: {e:#}");
                        None
                    }
                    Err(_) => {
                        tracing::warn!("oracle call timed out after {}s", timeout.as_secs());
                        None
                    }
                }
            }
        });
        let replies: Vec<_> = futures::future::join_all(calls).await;

        let mut grades = Vec::with_capacity(replies.len());
        let mut diagnostics: Vec<AlignmentDiagnostics> = Vec::new();
        let mut feedback: Option<String> = None;
        for reply in &replies {
            match reply {
                Some(reply) => {
                    let (breakdown, diag) = align(rubric, reply, self.config.fuzzy_cutoff);
                    grades.push(UniformGrade {
                        total: diag.recomputed_total as f64,
                        per_criterion: breakdown.clone(),
                        uncertainty: reply.uncertainty.unwrap_or(ORACLE_DEFAULT_UNCERTAINTY),
                    });
                    if feedback.is_none() {
                        if let Some(text) = reply.feedback.as_deref().filter(|t| !t.trim().is_empty())
                        {
                            feedback = Some(format!(
                                "{}\n\n{}",
                                feedback_header(rubric, &breakdown),
                                text.trim()
                            ));
                        }
                    }
                    diagnostics.push(diag);
                }
                None => grades.push(UniformGrade::degraded()),
            }
        }

        let mut result = fuse(&grades, rubric, Modality::Text, &self.config.review);
        result.debug = serde_json::to_value(&diagnostics).ok();
        QuestionOutcome {
            question_id: block.id.clone(),
            result,
            feedback,
        }
    }
}
