//! Web search via the Brave Search API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use relaydeck_schema::ExecutionContext;
use serde::Deserialize;
use serde_json::json;

use crate::tool::{ParamSpec, ToolDef, ToolExecutor};

const BRAVE_API_BASE: &str = "https://api.search.brave.com";
const RESULT_COUNT: usize = 5;

pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base(api_key, BRAVE_API_BASE)
    }

    pub fn with_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ToolExecutor for WebSearchTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            id: "web_search".into(),
            name: "Web Search".into(),
            description: "Search the web for current information and news".into(),
            parameters: vec![ParamSpec::string("query", true, "The search query")],
        }
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ExecutionContext,
    ) -> Result<serde_json::Value> {
        let query = params["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| anyhow!("missing required parameter: query"))?;

        let url = format!("{}/res/v1/web/search", self.api_base);
        let count = RESULT_COUNT.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[("q", query), ("count", count.as_str())])
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .context("brave search request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("brave search error ({status}): {body}"));
        }

        let body: BraveResponse = resp.json().await.context("invalid brave search body")?;
        let results: Vec<serde_json::Value> = body
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .take(RESULT_COUNT)
            .map(|r| {
                json!({
                    "title": r.title,
                    "url": r.url,
                    "snippet": r.description,
                })
            })
            .collect();

        Ok(json!({ "query": query, "results": results }))
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("user-1", Uuid::new_v4())
    }

    #[tokio::test]
    async fn search_returns_structured_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .and(query_param("q", "rust llm routing"))
            .and(header("X-Subscription-Token", "bsk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "web": {
                    "results": [
                        {"title": "Routing 101", "url": "https://example.com/a", "description": "intro"},
                        {"title": "Fallbacks", "url": "https://example.com/b", "description": "deep dive"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let tool = WebSearchTool::with_base("bsk-test", server.uri());
        let out = tool
            .execute(json!({"query": "rust llm routing"}), &ctx())
            .await
            .unwrap();

        assert_eq!(out["query"], "rust llm routing");
        assert_eq!(out["results"].as_array().unwrap().len(), 2);
        assert_eq!(out["results"][0]["title"], "Routing 101");
    }

    #[tokio::test]
    async fn missing_query_is_an_error() {
        let tool = WebSearchTool::with_base("bsk-test", "http://127.0.0.1:1");
        let err = tool.execute(json!({}), &ctx()).await.err().unwrap();
        assert!(err.to_string().contains("query"));
    }

    #[tokio::test]
    async fn upstream_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let tool = WebSearchTool::with_base("bsk-test", server.uri());
        let err = tool
            .execute(json!({"query": "anything"}), &ctx())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("429"));
    }
}
