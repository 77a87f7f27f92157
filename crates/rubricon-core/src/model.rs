//! Ingestion-facing data model.
//!
//! A [`QuestionBlock`] is the contract with the (external) document
//! ingestion collaborator: one question/answer pair with its structural
//! cues, rubric, ideal answer, and optional test cases.

use serde::{Deserialize, Serialize};

use crate::rubric::RubricSource;

/// One question/answer pair to grade.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBlock {
    /// Unique identifier for this block.
    pub id: String,
    /// The question plus the student's free-form answer text.
    pub question_text: String,
    /// Math fragments extracted by ingestion (LaTeX or plain).
    #[serde(default)]
    pub latex_fragments: Vec<String>,
    /// Code submission extracted by ingestion, if any.
    #[serde(default)]
    pub code_block: Option<CodeSubmission>,
    /// Instructor rubric in whatever shape ingestion produced.
    #[serde(default)]
    pub rubric: Option<RubricSource>,
    /// Instructor's ideal answer (text or expression).
    #[serde(default)]
    pub ideal_answer: String,
    /// Test cases for the code path.
    #[serde(default)]
    pub tests: Option<Vec<TestCase>>,
}

impl QuestionBlock {
    /// Whether ingestion extracted math markup for this block.
    pub fn has_math_markup(&self) -> bool {
        self.latex_fragments.iter().any(|f| !f.trim().is_empty())
    }

    /// Whether ingestion extracted a non-blank code submission.
    pub fn has_code_markup(&self) -> bool {
        self.code_block
            .as_ref()
            .is_some_and(|c| !c.content.trim().is_empty())
    }
}

/// A student's code submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSubmission {
    /// Source language as reported by ingestion (e.g. "python").
    #[serde(default = "default_language", alias = "lang")]
    pub language: String,
    /// The submitted source text.
    pub content: String,
}

fn default_language() -> String {
    "python".to_string()
}

/// One input/expected-output test case for the code scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Piped to the program's standard input.
    #[serde(default)]
    pub input: String,
    /// Expected standard output, compared after trimming.
    #[serde(alias = "output")]
    pub expected: String,
}
