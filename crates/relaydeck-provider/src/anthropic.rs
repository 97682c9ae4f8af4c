//! Anthropic messages API client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{ChatCompletion, ChatProvider, ChatRequest, ProviderError, TokenUsage};

const VENDOR: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    // Anthropic takes system text out-of-band; only user/assistant turns go
    // in the messages array.
    fn to_api_request(request: &ChatRequest) -> ApiRequest {
        ApiRequest {
            model: request.model.clone(),
            system: request.system_text(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: request
                .non_system_messages()
                .into_iter()
                .map(|m| ApiMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let url = format!("{}/v1/messages", self.api_base);
        let payload = Self::to_api_request(&request);

        let resp = self
            .client
            .post(url)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(VENDOR, &e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(VENDOR, status, &text));
        }

        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Unknown(format!("{VENDOR} api error: invalid body: {e}")))?;

        let content = body
            .content
            .iter()
            .filter_map(|block| {
                if block.block_type == "text" {
                    block.text.as_deref()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(ChatCompletion {
            content,
            usage: TokenUsage::new(body.usage.input_tokens, body.usage.output_tokens),
            model_echo: body.model,
        })
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    content: Vec<ApiContentBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn system_messages_are_hoisted() {
        let req = ChatRequest {
            model: "claude-3-5-sonnet".into(),
            messages: vec![
                WireMessage::system("Be helpful."),
                WireMessage::user("hi"),
                WireMessage::assistant("hello"),
                WireMessage::user("again"),
            ],
            max_tokens: 256,
            temperature: Some(0.7),
        };
        let api_req = AnthropicProvider::to_api_request(&req);

        assert_eq!(api_req.system.as_deref(), Some("Be helpful."));
        assert_eq!(api_req.messages.len(), 3);
        assert!(api_req.messages.iter().all(|m| m.role != "system"));
    }

    #[tokio::test]
    async fn chat_maps_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "claude-3-5-sonnet-20241022",
                "content": [{"type": "text", "text": "Hello "}, {"type": "text", "text": "there"}],
                "usage": {"input_tokens": 12, "output_tokens": 4}
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-test", server.uri());
        let resp = provider
            .chat(ChatRequest::simple("claude-3-5-sonnet", "hi"))
            .await
            .unwrap();

        assert_eq!(resp.content, "Hello there");
        assert_eq!(resp.usage.prompt_units, 12);
        assert_eq!(resp.usage.completion_units, 4);
        assert_eq!(resp.model_echo, "claude-3-5-sonnet-20241022");
    }

    #[tokio::test]
    async fn chat_classifies_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-test", server.uri());
        let err = provider
            .chat(ChatRequest::simple("claude-3-5-sonnet", "hi"))
            .await
            .err()
            .unwrap();

        assert_eq!(err.kind(), "rate_limit");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn chat_classifies_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-bad", server.uri());
        let err = provider
            .chat(ChatRequest::simple("claude-3-5-sonnet", "hi"))
            .await
            .err()
            .unwrap();

        assert_eq!(err.kind(), "auth");
    }
}
