//! Email hand-off. Delivery itself is an external collaborator reached
//! through a configured webhook; this tool only validates and posts.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use relaydeck_schema::ExecutionContext;
use serde_json::json;

use crate::tool::{ParamSpec, ToolDef, ToolExecutor};

pub struct EmailTool {
    client: reqwest::Client,
    webhook_url: String,
}

impl EmailTool {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl ToolExecutor for EmailTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            id: "send_email".into(),
            name: "Send Email".into(),
            description: "Send an email on the user's behalf".into(),
            parameters: vec![
                ParamSpec::string("to", true, "Recipient address"),
                ParamSpec::string("subject", true, "Subject line"),
                ParamSpec::string("body", true, "Message body"),
            ],
        }
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ExecutionContext,
    ) -> Result<serde_json::Value> {
        let to = require_str(&params, "to")?;
        let subject = require_str(&params, "subject")?;
        let body = require_str(&params, "body")?;

        if !to.contains('@') {
            return Err(anyhow!("invalid recipient address: {to}"));
        }

        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&json!({
                "to": to,
                "subject": subject,
                "body": body,
                "requested_by": ctx.user_id,
            }))
            .send()
            .await
            .context("email webhook request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("email webhook error ({status}): {text}"));
        }

        Ok(json!({ "delivered": true, "to": to, "subject": subject }))
    }
}

fn require_str<'a>(params: &'a serde_json::Value, name: &str) -> Result<&'a str> {
    params[name]
        .as_str()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("missing required parameter: {name}"))
}
