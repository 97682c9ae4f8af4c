//! Image generation via an OpenAI-compatible images endpoint.
//!
//! Billed per call, not per token; the usage accountant carries the flat
//! unit cost under this tool's id.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use relaydeck_schema::ExecutionContext;
use serde::Deserialize;
use serde_json::json;

use crate::tool::{ParamSpec, ToolDef, ToolExecutor};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "dall-e-3";
const DEFAULT_SIZE: &str = "1024x1024";

pub struct ImageGenTool {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl ImageGenTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base(api_key, DEFAULT_API_BASE)
    }

    pub fn with_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ToolExecutor for ImageGenTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            id: "generate_image".into(),
            name: "Image Generation".into(),
            description: "Generate an image from a text prompt".into(),
            parameters: vec![
                ParamSpec::string("prompt", true, "What the image should depict"),
                ParamSpec::string("size", false, "Output resolution")
                    .with_enum(&["1024x1024", "512x512", "256x256"]),
            ],
        }
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ExecutionContext,
    ) -> Result<serde_json::Value> {
        let prompt = params["prompt"]
            .as_str()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| anyhow!("missing required parameter: prompt"))?;
        let size = params["size"].as_str().unwrap_or(DEFAULT_SIZE);

        let url = format!("{}/images/generations", self.api_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": DEFAULT_MODEL,
                "prompt": prompt,
                "n": 1,
                "size": size,
            }))
            .send()
            .await
            .context("image generation request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("image generation error ({status}): {body}"));
        }

        let body: ImagesResponse = resp.json().await.context("invalid images body")?;
        let image = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("image generation returned no data"))?;

        Ok(json!({
            "prompt": prompt,
            "size": size,
            "url": image.url,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: String,
}
