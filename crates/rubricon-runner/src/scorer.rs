//! Test-based code scoring with syntax/smoke fallbacks.
//!
//! With tests supplied, the award is strictly proportional to the pass
//! count. Without tests, valid code is never hard-zeroed: a clean compile
//! earns a small tier, and a smoke run that produces output earns a larger
//! one. The scorer is infallible at its trait seam; sandbox failures
//! become failing test results, not errors.

use std::time::Duration;

use async_trait::async_trait;

use rubricon_core::config::GradingConfig;
use rubricon_core::grade::{CodeDetails, CodeReason, CodeVerdict, TestCaseFailure};
use rubricon_core::model::{CodeSubmission, TestCase};
use rubricon_core::rubric::{distribute_proportionally, Rubric};
use rubricon_core::traits::CodeScorer;

use crate::sandbox::ExecSandbox;

const STDERR_EXCERPT_LEN: usize = 120;

/// The default sandboxed code scorer.
#[derive(Debug, Clone)]
pub struct SandboxScorer {
    interpreter: String,
    time_limit: Duration,
    /// Credit fraction for code that compiles but has no tests.
    syntax_tier: f64,
    /// Credit fraction for untested code whose smoke run prints output.
    smoke_tier: f64,
}

impl Default for SandboxScorer {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            time_limit: Duration::from_secs(6),
            syntax_tier: 0.2,
            smoke_tier: 0.4,
        }
    }
}

impl SandboxScorer {
    pub fn from_config(config: &GradingConfig) -> Self {
        Self {
            time_limit: Duration::from_secs(config.exec_time_limit_secs),
            syntax_tier: config.syntax_tier,
            smoke_tier: config.smoke_tier,
            ..Self::default()
        }
    }

    pub fn with_interpreter(mut self, interpreter: &str) -> Self {
        self.interpreter = interpreter.to_string();
        self
    }

    async fn grade_with_tests(
        &self,
        sandbox: &ExecSandbox,
        tests: &[TestCase],
        rubric: &Rubric,
        total_points: u32,
    ) -> CodeVerdict {
        let mut passed = 0u32;
        let mut failures = Vec::new();
        for test in tests {
            let expected = test.expected.trim();
            match sandbox.run(&test.input).await {
                Ok(outcome) if outcome.success() && outcome.stdout == expected => passed += 1,
                Ok(outcome) => failures.push(TestCaseFailure {
                    input: test.input.clone(),
                    expected: expected.to_string(),
                    actual: outcome.stdout,
                    exit_code: outcome.exit_code,
                    stderr: outcome.stderr,
                }),
                Err(e) => {
                    tracing::warn!("sandbox run failed: {e:#}");
                    failures.push(TestCaseFailure {
                        input: test.input.clone(),
                        expected: expected.to_string(),
                        actual: String::new(),
                        exit_code: -1,
                        stderr: e.to_string(),
                    });
                }
            }
        }

        let ratio = passed as f64 / tests.len() as f64;
        let total = (ratio * total_points as f64).round() as u32;
        CodeVerdict {
            total,
            breakdown: distribute_proportionally(total as f64, rubric),
            details: CodeDetails {
                reason: CodeReason::Tests,
                passed: Some(passed),
                total: Some(tests.len() as u32),
                failures,
            },
        }
    }

    async fn grade_without_tests(
        &self,
        sandbox: &ExecSandbox,
        rubric: &Rubric,
        total_points: u32,
    ) -> CodeVerdict {
        let syntax_ok = match sandbox.check_syntax().await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("syntax check failed: {e:#}");
                false
            }
        };
        if !syntax_ok || total_points == 0 {
            return zero_verdict(rubric, CodeReason::NoTestsAndBadCode);
        }

        // Floor of one point so valid code is visibly non-zero.
        let syntax_award = ((self.syntax_tier * total_points as f64).round() as u32).max(1);

        let (award, reason) = match sandbox.run("").await {
            Ok(outcome) if outcome.success() && !outcome.stdout.is_empty() => {
                let smoke_award = (self.smoke_tier * total_points as f64).round() as u32;
                (syntax_award.max(smoke_award), CodeReason::SmokeRunOutput)
            }
            Ok(outcome) if outcome.success() => (syntax_award, CodeReason::SmokeRunOk),
            Ok(outcome) => {
                let mut excerpt = outcome.stderr;
                excerpt.truncate(
                    excerpt
                        .char_indices()
                        .nth(STDERR_EXCERPT_LEN)
                        .map(|(i, _)| i)
                        .unwrap_or(excerpt.len()),
                );
                (
                    syntax_award,
                    CodeReason::SyntaxOkRuntimeIssue {
                        stderr_excerpt: excerpt,
                    },
                )
            }
            Err(e) => (
                syntax_award,
                CodeReason::SyntaxOkRuntimeIssue {
                    stderr_excerpt: e.to_string(),
                },
            ),
        };

        CodeVerdict {
            total: award,
            breakdown: distribute_proportionally(award as f64, rubric),
            details: CodeDetails {
                reason,
                passed: None,
                total: None,
                failures: vec![],
            },
        }
    }
}

fn zero_verdict(rubric: &Rubric, reason: CodeReason) -> CodeVerdict {
    CodeVerdict {
        total: 0,
        breakdown: rubric.zero_breakdown(),
        details: CodeDetails {
            reason,
            passed: Some(0),
            total: Some(0),
            failures: vec![],
        },
    }
}

#[async_trait]
impl CodeScorer for SandboxScorer {
    async fn grade(
        &self,
        submission: &CodeSubmission,
        tests: &[TestCase],
        rubric: &Rubric,
    ) -> CodeVerdict {
        if submission.content.trim().is_empty() {
            return zero_verdict(rubric, CodeReason::Blank);
        }
        if !submission.language.eq_ignore_ascii_case("python") {
            tracing::warn!(language = %submission.language, "unsupported submission language");
            return zero_verdict(rubric, CodeReason::NoTestsAndBadCode);
        }

        let total_points = rubric.total_possible();
        let sandbox =
            match ExecSandbox::new(&self.interpreter, &submission.content, self.time_limit) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("sandbox setup failed: {e:#}");
                    return zero_verdict(rubric, CodeReason::NoTestsAndBadCode);
                }
            };

        if tests.is_empty() {
            self.grade_without_tests(&sandbox, rubric, total_points).await
        } else {
            self.grade_with_tests(&sandbox, tests, rubric, total_points)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok()
    }

    fn rubric() -> Rubric {
        Rubric::from_pairs([("Correctness", 6), ("Style", 4)]).unwrap()
    }

    fn submission(code: &str) -> CodeSubmission {
        CodeSubmission {
            language: "python".to_string(),
            content: code.to_string(),
        }
    }

    fn case(input: &str, expected: &str) -> TestCase {
        TestCase {
            input: input.to_string(),
            expected: expected.to_string(),
        }
    }

    #[tokio::test]
    async fn blank_submission_scores_zero() {
        let v = SandboxScorer::default()
            .grade(&submission("   \n"), &[], &rubric())
            .await;
        assert_eq!(v.total, 0);
        assert_eq!(v.details.reason, CodeReason::Blank);
    }

    #[tokio::test]
    async fn all_tests_pass_full_credit() {
        if !python_available() {
            return;
        }
        let code = "print(int(input()) * 2)";
        let tests = [case("3", "6"), case("5", "10")];
        let v = SandboxScorer::default()
            .grade(&submission(code), &tests, &rubric())
            .await;
        assert_eq!(v.total, 10);
        assert_eq!(v.details.reason, CodeReason::Tests);
        assert_eq!(v.details.passed, Some(2));
        assert!(v.details.failures.is_empty());
    }

    #[tokio::test]
    async fn half_passing_tests_half_credit() {
        if !python_available() {
            return;
        }
        let code = "print(int(input()) * 2)";
        let tests = [case("3", "6"), case("5", "11")];
        let v = SandboxScorer::default()
            .grade(&submission(code), &tests, &rubric())
            .await;
        assert_eq!(v.total, 5);
        assert_eq!(v.details.passed, Some(1));
        assert_eq!(v.details.failures.len(), 1);
        assert_eq!(v.details.failures[0].actual, "10");
        assert_eq!(v.breakdown.total(), 5);
    }

    #[tokio::test]
    async fn crash_recorded_as_failure() {
        if !python_available() {
            return;
        }
        let code = "raise RuntimeError('oops')";
        let tests = [case("", "anything")];
        let v = SandboxScorer::default()
            .grade(&submission(code), &tests, &rubric())
            .await;
        assert_eq!(v.total, 0);
        assert_ne!(v.details.failures[0].exit_code, 0);
        assert!(v.details.failures[0].stderr.contains("oops"));
    }

    #[tokio::test]
    async fn no_tests_with_output_gets_smoke_tier() {
        if !python_available() {
            return;
        }
        let v = SandboxScorer::default()
            .grade(&submission("print('hello')"), &[], &rubric())
            .await;
        assert_eq!(v.total, 4);
        assert_eq!(v.details.reason, CodeReason::SmokeRunOutput);
    }

    #[tokio::test]
    async fn no_tests_silent_gets_syntax_tier() {
        if !python_available() {
            return;
        }
        let v = SandboxScorer::default()
            .grade(&submission("x = 1 + 1"), &[], &rubric())
            .await;
        assert_eq!(v.total, 2);
        assert_eq!(v.details.reason, CodeReason::SmokeRunOk);
    }

    #[tokio::test]
    async fn no_tests_runtime_error_keeps_syntax_tier() {
        if !python_available() {
            return;
        }
        let v = SandboxScorer::default()
            .grade(&submission("raise ValueError('later')"), &[], &rubric())
            .await;
        assert_eq!(v.total, 2);
        match v.details.reason {
            CodeReason::SyntaxOkRuntimeIssue { ref stderr_excerpt } => {
                assert!(stderr_excerpt.contains("later"));
            }
            ref other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_tests_bad_syntax_scores_zero() {
        if !python_available() {
            return;
        }
        let v = SandboxScorer::default()
            .grade(&submission("def broken(:"), &[], &rubric())
            .await;
        assert_eq!(v.total, 0);
        assert_eq!(v.details.reason, CodeReason::NoTestsAndBadCode);
    }

    #[tokio::test]
    async fn unsupported_language_scores_zero() {
        let sub = CodeSubmission {
            language: "cobol".to_string(),
            content: "DISPLAY 'HI'".to_string(),
        };
        let v = SandboxScorer::default().grade(&sub, &[], &rubric()).await;
        assert_eq!(v.total, 0);
        assert_eq!(v.details.reason, CodeReason::NoTestsAndBadCode);
    }

    #[tokio::test]
    async fn timeout_counts_as_test_failure() {
        if !python_available() {
            return;
        }
        let scorer = SandboxScorer {
            time_limit: Duration::from_millis(300),
            ..SandboxScorer::default()
        };
        let tests = [case("", "done")];
        let v = scorer
            .grade(&submission("while True: pass"), &tests, &rubric())
            .await;
        assert_eq!(v.total, 0);
        assert_eq!(v.details.failures[0].exit_code, crate::sandbox::TIMEOUT_EXIT_CODE);
    }
}
