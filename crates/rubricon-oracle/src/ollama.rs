//! Ollama (local LLM) scoring oracle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use rubricon_core::traits::{OracleReply, OracleRequest, ScoringOracle};

use crate::error::OracleError;
use crate::prompt::{build_prompt, extract_json};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "mistral";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // Local models are slow.
const SYSTEM_PROMPT: &str = "You are a grading assistant. Respond ONLY with the requested JSON \
                             object. Do not include explanations or markdown formatting.";

/// Scoring oracle backed by a local Ollama instance.
pub struct OllamaOracle {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaOracle {
    pub fn new(base_url: &str, model: &str) -> Self {
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            client,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl ScoringOracle for OllamaOracle {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn score(&self, request: &OracleRequest) -> anyhow::Result<OracleReply> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(request),
                },
            ],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else if e.is_connect() {
                    OracleError::NetworkError(format!(
                        "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                        self.base_url
                    ))
                } else {
                    OracleError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(OracleError::ModelNotFound(format!(
                "Model '{}' not found locally. Pull it with: ollama pull {}",
                self.model, self.model
            ))
            .into());
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError { status, message }.into());
        }

        let api_response: ChatResponse =
            response.json().await.map_err(|e| OracleError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let content = api_response.message.content;
        let json = extract_json(&content);
        let reply: OracleReply = serde_json::from_str(&json).map_err(|e| {
            OracleError::MalformedReply(format!(
                "{e}; reply started with: {}",
                content.chars().take(120).collect::<String>()
            ))
        })?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> OracleRequest {
        OracleRequest {
            question: "Define entropy.".to_string(),
            ideal_answer: "A measure of disorder.".to_string(),
            rubric_json: r#"[{"criterion":"Definition","max_points":5}]"#.to_string(),
            student_answer: "Disorder in a system.".to_string(),
            language: "English".to_string(),
            persona: None,
            exemplars: vec![],
        }
    }

    #[tokio::test]
    async fn successful_scoring() {
        let server = MockServer::start().await;

        let content = r#"{"total": 4, "criteria": [{"criterion": "Definition", "score": 4}], "feedback": "Close to ideal."}"#;
        let response_body = serde_json::json!({
            "message": {"role": "assistant", "content": content},
            "model": "mistral"
        });

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let oracle = OllamaOracle::new(&server.uri(), "mistral");
        let reply = oracle.score(&request()).await.unwrap();
        assert_eq!(reply.total, Some(4.0));
        assert_eq!(reply.criteria[0].criterion, "Definition");
        assert_eq!(reply.feedback.as_deref(), Some("Close to ideal."));
    }

    #[tokio::test]
    async fn fenced_reply_still_parses() {
        let server = MockServer::start().await;

        let content = "```json\n{\"total\": 2, \"criteria\": [{\"criterion\": \"Definition\", \"score\": 2}]}\n```";
        let response_body = serde_json::json!({
            "message": {"role": "assistant", "content": content},
            "model": "mistral"
        });

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let oracle = OllamaOracle::new(&server.uri(), "mistral");
        let reply = oracle.score(&request()).await.unwrap();
        assert_eq!(reply.total, Some(2.0));
    }

    #[tokio::test]
    async fn prose_reply_is_malformed() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "message": {"role": "assistant", "content": "The student did well, maybe 4 points?"},
            "model": "mistral"
        });

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let oracle = OllamaOracle::new(&server.uri(), "mistral");
        let err = oracle.score(&request()).await.unwrap_err();
        assert!(err.to_string().contains("malformed oracle reply"));
    }

    #[tokio::test]
    async fn model_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let oracle = OllamaOracle::new(&server.uri(), "missing-model");
        let err = oracle.score(&request()).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn server_error_surfaces_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let oracle = OllamaOracle::new(&server.uri(), "mistral");
        let err = oracle.score(&request()).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }
}
