//! rubricon-runner — Sandboxed code execution and scoring.
//!
//! Runs student submissions in throwaway interpreter sandboxes and turns
//! their behavior into rubric-aligned code verdicts.

pub mod sandbox;
pub mod scorer;

pub use sandbox::{ExecSandbox, RunOutcome, TIMEOUT_EXIT_CODE};
pub use scorer::SandboxScorer;
