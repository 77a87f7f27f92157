//! Grading prompt assembly and lenient reply extraction.

use std::sync::OnceLock;

use regex::Regex;

use rubricon_core::traits::OracleRequest;

/// Most exemplars included in a prompt.
const MAX_EXEMPLARS: usize = 3;

/// Longest exemplar snippet, in characters.
const EXEMPLAR_SNIPPET_LEN: usize = 700;

/// Build the grading prompt for one oracle call.
///
/// The contract with the model: integer scores per rubric criterion, the
/// exact criterion names, and nothing but JSON. The alignment layer
/// tolerates violations anyway; the prompt just makes them rarer.
pub fn build_prompt(request: &OracleRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a grader. Grade the student's answer strictly by the provided rubric.\n",
    );
    prompt.push_str(&format!("Respond in {}.\n", request.language));
    if let Some(persona) = &request.persona {
        prompt.push_str(&format!("Grading stance: {}\n", persona.instruction));
    }

    prompt.push_str(&format!("\nQuestion:\n{}\n", request.question));
    prompt.push_str(&format!("\nIdeal Answer:\n{}\n", request.ideal_answer));
    prompt.push_str(&format!(
        "\nRubric (JSON list of {{'criterion','max_points'}}):\n{}\n",
        request.rubric_json
    ));
    prompt.push_str(&format!("\nStudent Answer:\n{}\n", request.student_answer));

    if !request.exemplars.is_empty() {
        prompt.push_str("\nContext (consistency reference):\n");
        for (i, exemplar) in request.exemplars.iter().take(MAX_EXEMPLARS).enumerate() {
            let snippet: String = exemplar.text.chars().take(EXEMPLAR_SNIPPET_LEN).collect();
            let score = exemplar
                .metadata
                .get("score")
                .map(String::as_str)
                .unwrap_or("");
            prompt.push_str(&format!("Exemplar {} (score {}):\n{}\n\n", i + 1, score, snippet));
        }
    }

    prompt.push_str(
        "\nInstructions:\n\
         - For each rubric criterion, assign an INTEGER score between 0 and its 'max_points' (INCLUSIVE).\n\
         - Do NOT invent or add criteria; use EXACTLY the criteria names from the rubric list.\n\
         - The 'criteria' array MUST have the SAME length and the SAME criteria names as the rubric.\n\
         - 'total' MUST equal the sum of the criterion scores.\n\
         - Provide concise feedback that justifies deductions.\n\
         \n\
         Respond ONLY with valid JSON matching:\n\
         {\"total\": <integer>, \"criteria\": [{\"criterion\": <string>, \"score\": <integer>}, ...], \"feedback\": <string>}\n",
    );
    prompt
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^```(?:json)?|```$").expect("fence regex"))
}

fn object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("object regex"))
}

/// Pull the JSON object out of a chatty reply: strip markdown fences, then
/// take the outermost `{…}` span. Returns the cleaned input when no object
/// is found, leaving the parse error to the caller.
pub fn extract_json(raw: &str) -> String {
    let cleaned = fence_re().replace_all(raw.trim(), "");
    let cleaned = cleaned.trim();
    match object_re().find(cleaned) {
        Some(m) => m.as_str().to_string(),
        None => cleaned.to_string(),
    }
}
