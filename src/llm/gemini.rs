//! Google Gemini `generateContent` 客户端
//!
//! System 消息放进 `systemInstruction`，其余按 user / model 交替放进 `contents`。
//! 营销与销售话术容易被默认安全过滤误拦，四个危害类别统一设为 BLOCK_NONE。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmSection;
use crate::core::LlmError;
use crate::llm::{LlmClient, Message, Role};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(api_key: &str, cfg: &LlmSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.to_string(),
            model: cfg.model.clone(),
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            temperature: cfg.temperature,
        }
    }

    fn build_request(&self, messages: &[Message]) -> GenerateRequest {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: Some(if m.role == Role::Assistant { "model" } else { "user" }.to_string()),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GenerateRequest {
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: system.join("\n\n"),
                }],
            }),
            contents,
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_request(messages))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model = %self.model, status = status.as_u16(), %body, "Gemini returned error");
            return Err(LlmError::Request(format!("Gemini returned {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::Blocked(reason));
        }

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(LlmError::Blocked("SAFETY".to_string()));
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let cfg = LlmSection {
            base_url: Some(server.uri()),
            model: "gemini-pro".to_string(),
            timeout_secs: 5,
            ..LlmSection::default()
        };
        GeminiClient::new("test-key", &cfg)
    }

    #[tokio::test]
    async fn test_complete_sends_instruction_temperature_and_safety() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-pro:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "systemInstruction": {"parts": [{"text": "Você é o Analista de Ouro."}]},
                "contents": [{"role": "user", "parts": [{"text": "Ana"}]}],
                "generationConfig": {"temperature": 0.4},
                "safetySettings": [
                    {"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE"},
                    {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"},
                    {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE"},
                    {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Perfeito, Ana. "}, {"text": "Qual o seu email?"}]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .complete(&[
                Message::system("Você é o Analista de Ouro."),
                Message::user("Ana"),
            ])
            .await
            .unwrap();
        assert_eq!(reply, "Perfeito, Ana. Qual o seu email?");
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "OTHER"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete(&[Message::user("x")]).await.unwrap_err();
        assert_eq!(err, LlmError::Blocked("OTHER".to_string()));
    }

    #[tokio::test]
    async fn test_http_error_is_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let err = client_for(&server).complete(&[Message::user("x")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Request(msg) if msg.contains("model not found")));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).complete(&[Message::user("x")]).await.unwrap_err();
        assert_eq!(err, LlmError::EmptyResponse);
    }
}
