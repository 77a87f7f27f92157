//! Modality routing: decide whether a question/answer pair goes to the
//! math, code, or text scoring path.
//!
//! The heuristic looks at structural cues first (code fences, math
//! delimiters) and falls back to keyword scanning. An optional external
//! classifier can override the heuristic; if it fails, the heuristic
//! answers. Routing itself never fails.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::traits::Classifier;

/// Scoring modality for a question block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Math,
    Code,
    Text,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Math => write!(f, "math"),
            Modality::Code => write!(f, "code"),
            Modality::Text => write!(f, "text"),
        }
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "math" => Ok(Modality::Math),
            "code" => Ok(Modality::Code),
            "text" | "essay" | "short" => Ok(Modality::Text),
            other => Err(format!("unknown modality: {other}")),
        }
    }
}

fn code_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(code|python|java|c\+\+|rust|function|class|def\s+)\b")
            .expect("code keyword regex")
    })
}

fn math_cue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[=^+\-*/]|\\frac|\\sum|\\int|\$").expect("math cue regex")
    })
}

/// Classify from structural cues and keyword heuristics.
///
/// Decision order: code markup wins, then math markup, then keyword scan
/// (code keywords before math operators), default text.
pub fn classify(text: &str, has_math_markup: bool, has_code_markup: bool) -> Modality {
    if has_code_markup {
        return Modality::Code;
    }
    if has_math_markup {
        return Modality::Math;
    }
    if code_keyword_re().is_match(text) {
        return Modality::Code;
    }
    if math_cue_re().is_match(text) {
        return Modality::Math;
    }
    Modality::Text
}

/// Classify with an optional external override.
///
/// The external classifier's answer wins when it succeeds; any error falls
/// back to the heuristic with a warning.
pub fn classify_with(
    external: Option<&dyn Classifier>,
    text: &str,
    has_math_markup: bool,
    has_code_markup: bool,
) -> Modality {
    if let Some(classifier) = external {
        match classifier.classify(text) {
            Ok(modality) => return modality,
            Err(e) => {
                tracing::warn!("external classifier failed, using heuristic: {e:#}");
            }
        }
    }
    classify(text, has_math_markup, has_code_markup)
}
