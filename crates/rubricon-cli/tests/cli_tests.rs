//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rubricon() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("rubricon").unwrap()
}

const VALID_BLOCKS: &str = r#"[
  {
    "id": "q1",
    "question_text": "Differentiate x^2.",
    "latex_fragments": ["2x"],
    "ideal_answer": "2*x",
    "rubric": [{"criterion": "Answer", "max_points": 5}]
  },
  {
    "id": "q2",
    "question_text": "Define entropy.",
    "ideal_answer": "A measure of disorder.",
    "rubric": [{"criterion": "Definition", "max_points": 5}]
  }
]"#;

#[test]
fn validate_valid_blocks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blocks.json");
    std::fs::write(&path, VALID_BLOCKS).unwrap();

    rubricon()
        .arg("validate")
        .arg("--input")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Question blocks: 2"))
        .stdout(predicate::str::contains("All question blocks valid"));
}

#[test]
fn validate_warns_on_problems() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blocks.json");
    let blocks = r#"[
      {"id": "q1", "question_text": "   "},
      {"id": "q1", "question_text": "Duplicate id", "rubric": []},
      {
        "id": "q3",
        "question_text": "Tests without code",
        "rubric": [{"criterion": "Answer", "max_points": 5}],
        "tests": [{"input": "1", "expected": "1"}]
      }
    ]"#;
    std::fs::write(&path, blocks).unwrap();

    rubricon()
        .arg("validate")
        .arg("--input")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("empty question text"))
        .stdout(predicate::str::contains("duplicate question id"))
        .stdout(predicate::str::contains("no rubric"))
        .stdout(predicate::str::contains("zero total points"))
        .stdout(predicate::str::contains("no code submission"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    rubricon()
        .arg("validate")
        .arg("--input")
        .arg("nonexistent.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn validate_malformed_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blocks.json");
    std::fs::write(&path, "{not json").unwrap();

    rubricon()
        .arg("validate")
        .arg("--input")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    rubricon()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created rubricon.toml"))
        .stdout(predicate::str::contains("Created questions/example.json"));

    assert!(dir.path().join("rubricon.toml").exists());
    assert!(dir.path().join("questions/example.json").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    rubricon()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    rubricon()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_output_validates() {
    let dir = TempDir::new().unwrap();

    rubricon()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    rubricon()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--input")
        .arg("questions/example.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("All question blocks valid"));
}

#[test]
fn run_math_only_batch() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("blocks.json");
    let blocks = r#"[
      {
        "id": "derivative",
        "question_text": "Differentiate x^2 + 3x.",
        "latex_fragments": ["2x + 3"],
        "ideal_answer": "2*x + 3",
        "rubric": [
          {"criterion": "Power rule", "max_points": 3},
          {"criterion": "Final answer", "max_points": 2}
        ]
      }
    ]"#;
    std::fs::write(&input, blocks).unwrap();
    let output = dir.path().join("results");

    rubricon()
        .current_dir(dir.path())
        .arg("run")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--parallelism")
        .arg("1")
        .assert()
        .success()
        .stderr(predicate::str::contains("derivative"))
        .stderr(predicate::str::contains("Report saved to"));

    let reports: Vec<_> = std::fs::read_dir(&output).unwrap().collect();
    assert_eq!(reports.len(), 1);
}

#[test]
fn run_rejects_empty_batch() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("blocks.json");
    std::fs::write(&input, "[]").unwrap();

    rubricon()
        .arg("run")
        .arg("--input")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no question blocks"));
}

#[test]
fn run_rejects_bad_context_kind() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("blocks.json");
    std::fs::write(&input, VALID_BLOCKS).unwrap();
    let context = dir.path().join("context.json");
    std::fs::write(
        &context,
        r#"[{"text": "x", "kind": "banana"}]"#,
    )
    .unwrap();

    rubricon()
        .arg("run")
        .arg("--input")
        .arg(&input)
        .arg("--context")
        .arg(&context)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown context kind"));
}

#[test]
fn help_output() {
    rubricon()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Automated rubric-based grading"));
}

#[test]
fn version_output() {
    rubricon()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rubricon"));
}
