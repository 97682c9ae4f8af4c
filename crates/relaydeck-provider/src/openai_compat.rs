//! OpenAI-compatible chat/completions client.
//!
//! OpenAI, Groq, OpenRouter and Together all speak the same wire format,
//! just with different base URLs. One client, a constructor per vendor.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{ChatCompletion, ChatProvider, ChatRequest, ProviderError, TokenUsage};

#[derive(Debug, Clone)]
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    vendor: String,
}

/// https://platform.openai.com/docs/api-reference/chat
pub fn openai(api_key: impl Into<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new("openai", api_key, "https://api.openai.com/v1")
}

/// https://console.groq.com/docs/api
pub fn groq(api_key: impl Into<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new("groq", api_key, "https://api.groq.com/openai/v1")
}

/// https://openrouter.ai/docs
pub fn openrouter(api_key: impl Into<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new("openrouter", api_key, "https://openrouter.ai/api/v1")
}

/// https://docs.together.ai/docs/openai-api-compatibility
pub fn together(api_key: impl Into<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new("together", api_key, "https://api.together.xyz/v1")
}

/// Any other OpenAI-compatible endpoint.
pub fn custom(
    vendor: impl Into<String>,
    api_key: impl Into<String>,
    base_url: impl Into<String>,
) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(vendor, api_key, base_url)
}

impl OpenAiCompatProvider {
    pub fn new(
        vendor: impl Into<String>,
        api_key: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            vendor: vendor.into(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let url = format!("{}/chat/completions", self.api_base);
        // system role passes straight through on this wire format
        let payload = ApiRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&self.vendor, &e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(&self.vendor, status, &text));
        }

        let body: ApiResponse = resp.json().await.map_err(|e| {
            ProviderError::Unknown(format!("{} api error: invalid body: {e}", self.vendor))
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            ProviderError::Unknown(format!("{} api error: empty choices", self.vendor))
        })?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_units: u.prompt_tokens,
                completion_units: u.completion_tokens,
                total_units: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ChatCompletion {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model_echo: body.model.unwrap_or(request.model),
        })
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn chat_maps_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama-3.1-70b-versatile",
                "choices": [{"message": {"role": "assistant", "content": "hi there"}}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("groq", "gsk-test", server.uri());
        let resp = provider
            .chat(ChatRequest::simple("llama-3.1-70b", "hello"))
            .await
            .unwrap();

        assert_eq!(resp.content, "hi there");
        assert_eq!(resp.usage.total(), 12);
        assert_eq!(resp.model_echo, "llama-3.1-70b-versatile");
    }

    #[tokio::test]
    async fn server_error_is_network_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("openrouter", "sk-or", server.uri());
        let err = provider
            .chat(ChatRequest::simple("m", "hello"))
            .await
            .err()
            .unwrap();

        assert_eq!(err.kind(), "network");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn missing_usage_defaults_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("together", "key", server.uri());
        let resp = provider.chat(ChatRequest::simple("m", "x")).await.unwrap();
        assert_eq!(resp.usage.total(), 0);
        // model echo falls back to the requested id
        assert_eq!(resp.model_echo, "m");
    }

    #[test]
    fn vendor_constructors_pin_base_urls() {
        assert_eq!(openai("k").api_base, "https://api.openai.com/v1");
        assert_eq!(groq("k").api_base, "https://api.groq.com/openai/v1");
        assert_eq!(openrouter("k").api_base, "https://openrouter.ai/api/v1");
        assert_eq!(together("k").api_base, "https://api.together.xyz/v1");
    }
}
