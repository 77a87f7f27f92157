//! The `rubricon init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create rubricon.toml
    if std::path::Path::new("rubricon.toml").exists() {
        println!("rubricon.toml already exists, skipping.");
    } else {
        std::fs::write("rubricon.toml", SAMPLE_CONFIG)?;
        println!("Created rubricon.toml");
    }

    // Create example question blocks
    std::fs::create_dir_all("questions")?;
    let example_path = std::path::Path::new("questions/example.json");
    if example_path.exists() {
        println!("questions/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUESTIONS)?;
        println!("Created questions/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit rubricon.toml (oracle model, grading knobs)");
    println!("  2. Run: rubricon validate --input questions/example.json");
    println!("  3. Run: rubricon run --input questions/example.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# rubricon configuration

parallelism = 4
output_dir = "./rubricon-results"

[oracle]
type = "ollama"
base_url = "${RUBRICON_OLLAMA_URL}"
model = "mistral"

[grading]
fuzzy_cutoff = 0.60
math_ensemble_runs = 2
exec_time_limit_secs = 6
language = "English"

[grading.review]
disagreement = 2.0
uncertainty = 0.5
"#;

const EXAMPLE_QUESTIONS: &str = r#"[
  {
    "id": "derivative",
    "question_text": "Differentiate f(x) = x^2 + 3x with respect to x.",
    "latex_fragments": ["2x + 3"],
    "ideal_answer": "2*x + 3",
    "rubric": [
      {"criterion": "Power rule", "max_points": 3},
      {"criterion": "Final answer", "max_points": 2}
    ]
  },
  {
    "id": "squares",
    "question_text": "Write a Python program that reads an integer and prints its square.",
    "code_block": {
      "language": "python",
      "content": "n = int(input())\nprint(n * n)\n"
    },
    "tests": [
      {"input": "3", "expected": "9"},
      {"input": "-4", "expected": "16"}
    ],
    "rubric": [
      {"criterion": "Correctness", "max_points": 8},
      {"criterion": "Reads input", "max_points": 2}
    ]
  },
  {
    "id": "entropy",
    "question_text": "Define entropy in your own words. Student answer: Entropy measures the disorder of a system and tends to increase over time.",
    "ideal_answer": "Entropy is a measure of the number of microscopic configurations consistent with a macroscopic state; in isolated systems it does not decrease.",
    "rubric": [
      {"criterion": "Definition", "max_points": 5},
      {"criterion": "Second law", "max_points": 5}
    ]
  }
]
"#;
