//! LaTeX-to-plain-math preprocessing.
//!
//! The parser speaks plain math (`(1)/(2) + x^2`). This module strips the
//! common LaTeX constructs instructors and students actually use down to
//! that form. It is a best-effort textual rewrite, not a LaTeX parser;
//! anything it cannot rewrite flows through and fails in the parser with
//! an explicit parse-failed verdict.

use std::sync::OnceLock;

use regex::Regex;

fn wrapper_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*(\${1,2}|\\\(|\\\[)\s*(.*?)\s*(\${1,2}|\\\)|\\\])\s*$")
            .expect("math wrapper regex")
    })
}

fn frac_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\\frac\s*\{([^{}]+)\}\s*\{([^{}]+)\}").expect("frac regex")
    })
}

fn sqrt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\sqrt\s*\{([^{}]+)\}").expect("sqrt regex"))
}

fn text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\text\s*\{[^{}]*\}").expect("text regex"))
}

fn spacing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\left|\\right|\\,").expect("spacing regex"))
}

/// Strip `$…$`, `$$…$$`, `\(…\)`, `\[…\]` delimiters if present.
pub fn unwrap_delimiters(s: &str) -> &str {
    match wrapper_re().captures(s) {
        Some(caps) => caps.get(2).map(|m| m.as_str()).unwrap_or(s),
        None => s.trim(),
    }
}

/// Rewrite common LaTeX into plain math the parser accepts.
pub fn to_plain_math(s: &str) -> String {
    let s = unwrap_delimiters(s);
    let s = spacing_re().replace_all(s, "");
    let s = s
        .replace(r"\cdot", "*")
        .replace(r"\times", "*")
        .replace(r"\div", "/");
    let s = frac_re().replace_all(&s, "(${1})/(${2})");
    let s = sqrt_re().replace_all(&s, "(${1})^(0.5)");
    let s = text_re().replace_all(&s, "");
    // Remaining grouping braces (e.g. x^{2}) become parens.
    s.replace('{', "(").replace('}', ")").trim().to_string()
}
