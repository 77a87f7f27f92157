//! Sandboxed execution of one student program.
//!
//! Each sandbox is a temporary directory holding the submitted source.
//! Runs go through the system interpreter with piped stdio, a wall-clock
//! timeout, and a scrubbed environment. On drop, the directory is cleaned
//! up and any still-running child is killed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Exit code reported for a timed-out run, matching the shell convention.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Outcome of one sandboxed program run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
    /// Stdout, trimmed.
    pub stdout: String,
    /// Stderr, trimmed.
    pub stderr: String,
    pub timed_out: bool,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A sandboxed interpreter workspace for one submission.
pub struct ExecSandbox {
    work_dir: TempDir,
    interpreter: String,
    time_limit: Duration,
    program: PathBuf,
}

impl ExecSandbox {
    /// Create a sandbox holding `code` as the program to run.
    pub fn new(interpreter: &str, code: &str, time_limit: Duration) -> Result<Self> {
        let work_dir = TempDir::new().context("failed to create sandbox directory")?;
        let program = work_dir.path().join("main.py");
        std::fs::write(&program, code).context("failed to write program source")?;
        Ok(Self {
            work_dir,
            interpreter: interpreter.to_string(),
            time_limit,
            program,
        })
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    /// Run the program with `stdin_data` piped to its standard input.
    ///
    /// A run that exceeds the time limit is killed and reported with exit
    /// code [`TIMEOUT_EXIT_CODE`]; this is not an error.
    pub async fn run(&self, stdin_data: &str) -> Result<RunOutcome> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(&self.program)
            .current_dir(self.work_dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in scrubbed_env() {
            command.env(key, value);
        }

        let mut child = command.spawn().context("failed to spawn interpreter")?;
        if let Some(mut stdin) = child.stdin.take() {
            // The child may exit without reading; a broken pipe is fine.
            let _ = stdin.write_all(stdin_data.as_bytes()).await;
            drop(stdin);
        }

        match tokio::time::timeout(self.time_limit, child.wait_with_output()).await {
            Ok(output) => {
                let output = output.context("failed to collect program output")?;
                Ok(RunOutcome {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    timed_out: false,
                })
            }
            Err(_) => {
                // Dropping the future killed the child (kill_on_drop).
                Ok(RunOutcome {
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout: String::new(),
                    stderr: "Timeout".to_string(),
                    timed_out: true,
                })
            }
        }
    }

    /// Whether the program is syntactically valid, via `-m py_compile`.
    pub async fn check_syntax(&self) -> Result<bool> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg("-m")
            .arg("py_compile")
            .arg(&self.program)
            .current_dir(self.work_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in scrubbed_env() {
            command.env(key, value);
        }

        let status = tokio::time::timeout(self.time_limit, command.status())
            .await
            .context("syntax check timed out")?
            .context("failed to run syntax check")?;
        Ok(status.success())
    }
}

/// Environment overrides clearing credentials so student code cannot read
/// them from the inherited environment.
fn scrubbed_env() -> Vec<(String, String)> {
    [
        "SSH_AUTH_SOCK",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_SESSION_TOKEN",
        "GITHUB_TOKEN",
        "GH_TOKEN",
        "ANTHROPIC_API_KEY",
        "OPENAI_API_KEY",
        "DOCKER_HOST",
        "DOCKER_CONFIG",
        "KUBECONFIG",
        "DATABASE_URL",
        "NPM_TOKEN",
    ]
    .iter()
    .map(|var| (var.to_string(), String::new()))
    .collect()
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

    fn sandbox(code: &str) -> ExecSandbox {
        ExecSandbox::new("python3", code, Duration::from_secs(6)).unwrap()
    }

    #[tokio::test]
    async fn echo_program_round_trips_stdin() {
        if !python_available() {
            return;
        }
        let s = sandbox("print(input()[::-1])");
        let outcome = s.run("hello").await.unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.stdout, "olleh");
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn crash_reports_nonzero_exit() {
        if !python_available() {
            return;
        }
        let s = sandbox("raise ValueError('boom')");
        let outcome = s.run("").await.unwrap();
        assert_ne!(outcome.exit_code, 0);
        assert!(outcome.stderr.contains("boom"));
    }

    #[tokio::test]
    async fn infinite_loop_times_out() {
        let s = ExecSandbox::new("python3", "while True: pass", Duration::from_millis(300)).unwrap();
        if !python_available() {
            return;
        }
        let outcome = s.run("").await.unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, TIMEOUT_EXIT_CODE);
    }

    #[tokio::test]
    async fn syntax_check_distinguishes() {
        if !python_available() {
            return;
        }
        assert!(sandbox("x = 1").check_syntax().await.unwrap());
        assert!(!sandbox("def broken(:").check_syntax().await.unwrap());
    }

    #[tokio::test]
    async fn credentials_scrubbed_from_child() {
        if !python_available() {
            return;
        }
        std::env::set_var("GITHUB_TOKEN", "secret");
        let s = sandbox("import os; print(os.environ.get('GITHUB_TOKEN', ''))");
        let outcome = s.run("").await.unwrap();
        std::env::remove_var("GITHUB_TOKEN");
        assert_eq!(outcome.stdout, "");
    }

    #[test]
    fn sandbox_writes_program() {
        let s = sandbox("print(1)");
        assert!(s.work_dir().join("main.py").exists());
    }
}
