//! The `rubricon validate` command.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

use rubricon_core::model::QuestionBlock;

pub fn execute(input: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read question blocks from {}", input.display()))?;
    let blocks: Vec<QuestionBlock> =
        serde_json::from_str(&content).context("failed to parse question blocks JSON")?;

    println!("Question blocks: {}", blocks.len());

    let mut warnings = 0;
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for block in &blocks {
        if !seen_ids.insert(&block.id) {
            println!("  [{}] WARNING: duplicate question id", block.id);
            warnings += 1;
        }
        if block.question_text.trim().is_empty() {
            println!("  [{}] WARNING: empty question text", block.id);
            warnings += 1;
        }
        match &block.rubric {
            None => {
                println!(
                    "  [{}] WARNING: no rubric; grading falls back to retrieved context",
                    block.id
                );
                warnings += 1;
            }
            Some(source) => match source.clone().normalize() {
                Err(e) => {
                    println!("  [{}] WARNING: invalid rubric: {e}", block.id);
                    warnings += 1;
                }
                Ok(rubric) if rubric.total_possible() == 0 => {
                    println!("  [{}] WARNING: rubric has zero total points", block.id);
                    warnings += 1;
                }
                Ok(_) => {}
            },
        }
        if block.tests.is_some() && !block.has_code_markup() {
            println!(
                "  [{}] WARNING: test cases present but no code submission",
                block.id
            );
            warnings += 1;
        }
    }

    if warnings == 0 {
        println!("All question blocks valid.");
    } else {
        println!("\n{warnings} warning(s) found.");
    }

    Ok(())
}
